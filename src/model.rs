//! Resolved in-memory configuration model (§3, §6).
//!
//! This is what the config layer (`config::load`) produces and the schema
//! layer (`schema::prepare`) enriches; the pipeline only ever sees this
//! model, never the raw YAML.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::PreparedStatementId;

/// Resolved `key -> value` option map passed to a column generator, merged
/// from type-specific defaults and any YAML `distributions.<column>`
/// overrides (§4.2.1, glossary).
pub type GeneratorArgs = HashMap<String, serde_yaml::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Insert,
    Select,
    Update,
    Delete,
}

impl QueryKind {
    /// Infers the kind from the first six characters of a CQL statement,
    /// lowercased (§4.8, §6).
    pub fn infer_from_cql(cql: &str) -> Option<Self> {
        let head: String = cql.trim().chars().take(6).collect::<String>().to_lowercase();
        match head.as_str() {
            "insert" => Some(QueryKind::Insert),
            "select" => Some(QueryKind::Select),
            "update" => Some(QueryKind::Update),
            "delete" => Some(QueryKind::Delete),
            _ => None,
        }
    }
}

/// Which of the three per-query seeds (§3, §4.1) an attribute is generated
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Partition,
    Cluster,
    /// Generic attribute level: uses the update seed.
    Attribute,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub type_tag: String,
    pub level: Level,
    pub args: GeneratorArgs,
    /// Stable hash of the qualified column name (`hashutil::stable_column_hash`),
    /// added to the level-selected seed so two attributes at the same level
    /// don't collide (§3).
    pub column_hash: u64,
    pub column_name: String,
}

/// A single configured query: its CQL, its prepared form (filled in by
/// `schema::prepare`), and the attribute list driving the DataFabricator.
#[derive(Debug, Clone)]
pub struct Query {
    pub cql: String,
    pub table: String,
    pub kind: QueryKind,
    /// Only meaningful for `Insert`; defaults to 1.0.
    pub chance: f64,
    pub attributes: Vec<Attribute>,
    pub prepared: Option<PreparedStatementId>,
}

#[derive(Debug, Clone)]
pub struct Workload {
    pub name: String,
    pub ratio: u32,
    pub queries: Vec<Query>,
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub definition: String,
    pub distributions: HashMap<String, GeneratorArgs>,
}

#[derive(Debug, Clone)]
pub struct KeyspaceSchema {
    pub name: String,
    pub definition: String,
    pub tables: Vec<TableSchema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum DatabaseKind {
    Cassandra,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub kind: DatabaseKind,
    pub connection_arguments: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Copy)]
pub struct LatencyTermination {
    /// Microseconds.
    pub max: u64,
    pub consecutive: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct QueriesTermination {
    pub max: Option<u64>,
    pub consecutive: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct TerminationConfig {
    pub latency: LatencyTermination,
    pub queries: QueriesTermination,
}

/// The fully resolved, immutable-after-startup configuration the pipeline is
/// built from (§3 expansion). Shared across workers via `Arc`.
#[derive(Debug, Clone)]
pub struct LoadgenConfig {
    pub database: DatabaseConfig,
    pub delete_old: bool,
    pub termination: TerminationConfig,
    pub schemata: Vec<KeyspaceSchema>,
    pub workloads: Vec<Workload>,
}

impl LoadgenConfig {
    pub fn ratio_sum(&self) -> u64 {
        self.workloads.iter().map(|w| w.ratio as u64).sum()
    }
}
