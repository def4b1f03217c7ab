//! YAML configuration loading and eager validation (§4.8, §6).
//!
//! Grounded on the teacher's `settings/command/user.rs` YAML structs
//! (`#[derive(Deserialize)] #[serde(deny_unknown_fields)]`), generalized from
//! a single user-profile command into the top-level config model. Unlike the
//! teacher (CLI-flag driven), the entire run is described by one YAML
//! document whose path is the process's only argument (§4.10).

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::LoadgenError;
use crate::generators::GeneratorRegistry;
use crate::model::{
    DatabaseConfig, DatabaseKind, GeneratorArgs, LatencyTermination, QueriesTermination,
    QueryKind, TerminationConfig,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRoot {
    config: RawTopConfig,
    schemata: HashMap<String, RawKeyspace>,
    workloads: HashMap<String, RawWorkload>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTopConfig {
    database: RawDatabase,
    #[serde(default = "default_true")]
    delete_old: bool,
    termination_conditions: RawTermination,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDatabase {
    #[serde(rename = "type")]
    kind: DatabaseKind,
    connection_arguments: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTermination {
    latency: RawLatencyTerm,
    queries: RawQueriesTerm,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLatencyTerm {
    max: u64,
    consecutive: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQueriesTerm {
    max: Option<u64>,
    consecutive: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawKeyspace {
    definition: String,
    #[serde(default)]
    tables: HashMap<String, RawTable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    definition: String,
    #[serde(default)]
    distributions: HashMap<String, GeneratorArgs>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWorkload {
    ratio: u32,
    queries: Vec<RawQuery>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuery {
    query: String,
    chance: Option<f64>,
}

/// A query after config-time validation: its CQL, inferred kind and
/// qualified table, but not yet prepared against a live session (that is
/// `schema::prepare`'s job, §4.9).
#[derive(Debug, Clone)]
pub struct ValidatedQuery {
    pub cql: String,
    pub table: String,
    pub kind: QueryKind,
    pub chance: f64,
}

#[derive(Debug, Clone)]
pub struct ValidatedWorkload {
    pub name: String,
    pub ratio: u32,
    pub queries: Vec<ValidatedQuery>,
}

#[derive(Debug, Clone)]
pub struct ValidatedTable {
    pub name: String,
    pub definition: String,
    pub distributions: HashMap<String, GeneratorArgs>,
}

#[derive(Debug, Clone)]
pub struct ValidatedKeyspace {
    pub name: String,
    pub definition: String,
    pub tables: Vec<ValidatedTable>,
}

/// The outcome of loading and validating a config file: ready for
/// `schema::prepare` to turn into a `model::LoadgenConfig` (§4.9).
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub database: DatabaseConfig,
    pub delete_old: bool,
    pub termination: TerminationConfig,
    pub schemata: Vec<ValidatedKeyspace>,
    pub workloads: Vec<ValidatedWorkload>,
}

/// Loads and eagerly validates the config at `path` (§4.8). Every failure
/// returns `LoadgenError::ConfigInvalid` naming the offending path, e.g.
/// `workloads.ins.queries[0].query`.
pub fn load(path: impl AsRef<Path>) -> Result<ValidatedConfig, LoadgenError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| LoadgenError::ConfigInvalid {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let raw: RawRoot = serde_yaml::from_str(&text).map_err(|e| LoadgenError::ConfigInvalid {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    validate(raw)
}

fn invalid(path: impl Into<String>, reason: impl Into<String>) -> LoadgenError {
    LoadgenError::ConfigInvalid {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Parses the target table out of an `INSERT INTO` / `SELECT ... FROM` /
/// `UPDATE` / `DELETE FROM` statement. Deliberately simple text scanning
/// (matching `QueryKind::infer_from_cql`'s own first-six-characters
/// approach) rather than a full CQL parser - the only thing this crate needs
/// out of the statement text before preparing it against a live session.
fn parse_table_name(cql: &str) -> Option<String> {
    let upper = cql.to_uppercase();
    let after_keyword = if let Some(pos) = upper.find("INTO") {
        &cql[pos + 4..]
    } else if let Some(pos) = upper.find("FROM") {
        &cql[pos + 4..]
    } else if upper.trim_start().starts_with("UPDATE") {
        &cql[upper.find("UPDATE").unwrap() + 6..]
    } else {
        return None;
    };
    after_keyword
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate(raw: RawRoot) -> Result<ValidatedConfig, LoadgenError> {
    let database = DatabaseConfig {
        kind: raw.config.database.kind,
        connection_arguments: raw.config.database.connection_arguments,
    };

    if raw.config.termination_conditions.latency.max == 0 {
        return Err(invalid(
            "config.termination_conditions.latency.max",
            "must be positive",
        ));
    }
    if raw.config.termination_conditions.latency.consecutive == 0 {
        return Err(invalid(
            "config.termination_conditions.latency.consecutive",
            "must be positive",
        ));
    }
    if raw.config.termination_conditions.queries.consecutive == 0 {
        return Err(invalid(
            "config.termination_conditions.queries.consecutive",
            "must be positive",
        ));
    }

    let termination = TerminationConfig {
        latency: LatencyTermination {
            max: raw.config.termination_conditions.latency.max,
            consecutive: raw.config.termination_conditions.latency.consecutive,
        },
        queries: QueriesTermination {
            max: raw.config.termination_conditions.queries.max,
            consecutive: raw.config.termination_conditions.queries.consecutive,
        },
    };

    let mut known_tables: HashMap<String, ()> = HashMap::new();
    let mut schemata = Vec::with_capacity(raw.schemata.len());
    for (ks_name, ks) in raw.schemata {
        let mut tables = Vec::with_capacity(ks.tables.len());
        for (table_name, table) in ks.tables {
            known_tables.insert(format!("{ks_name}@{table_name}"), ());
            tables.push(ValidatedTable {
                name: table_name,
                definition: table.definition,
                distributions: table.distributions,
            });
        }
        schemata.push(ValidatedKeyspace {
            name: ks_name,
            definition: ks.definition,
            tables,
        });
    }

    let registry = GeneratorRegistry::with_defaults();
    let _ = &registry; // only `schema::prepare` consults attribute type tags; kept here so an empty registry would still fail loudly if ever swapped in.

    let mut workloads = Vec::with_capacity(raw.workloads.len());
    for (w_name, w) in raw.workloads {
        if w.ratio == 0 {
            return Err(invalid(format!("workloads.{w_name}.ratio"), "must be positive"));
        }
        let mut queries = Vec::with_capacity(w.queries.len());
        for (i, q) in w.queries.into_iter().enumerate() {
            let path_prefix = format!("workloads.{w_name}.queries[{i}]");
            let kind = QueryKind::infer_from_cql(&q.query).ok_or_else(|| {
                invalid(
                    format!("{path_prefix}.query"),
                    "could not infer query kind (insert/select/update/delete) from statement",
                )
            })?;

            let chance = match (kind, q.chance) {
                (QueryKind::Insert, Some(c)) => {
                    if !(0.0..=1.0).contains(&c) {
                        return Err(invalid(format!("{path_prefix}.chance"), "must be in [0, 1]"));
                    }
                    c
                }
                (QueryKind::Insert, None) => 1.0,
                (_, Some(_)) => {
                    return Err(invalid(
                        format!("{path_prefix}.chance"),
                        "only meaningful for insert queries",
                    ))
                }
                (_, None) => 1.0,
            };

            let table_name = parse_table_name(&q.query).ok_or_else(|| {
                invalid(format!("{path_prefix}.query"), "could not determine target table")
            })?;

            let qualified = known_tables
                .keys()
                .find(|k| k.ends_with(&format!("@{table_name}")))
                .cloned()
                .ok_or_else(|| {
                    invalid(
                        format!("{path_prefix}.query"),
                        format!("table '{table_name}' is not declared in any schemata"),
                    )
                })?;

            queries.push(ValidatedQuery {
                cql: q.query,
                table: qualified,
                kind,
                chance,
            });
        }
        workloads.push(ValidatedWorkload {
            name: w_name,
            ratio: w.ratio,
            queries,
        });
    }

    if workloads.is_empty() {
        return Err(invalid("workloads", "at least one workload is required"));
    }

    Ok(ValidatedConfig {
        database,
        delete_old: raw.config.delete_old,
        termination,
        schemata,
        workloads,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
config:
  database:
    type: Cassandra
    connection_arguments:
      nodes: "127.0.0.1:9042"
  termination_conditions:
    latency:
      max: 1000000
      consecutive: 5
    queries:
      consecutive: 5
schemata:
  ks:
    definition: "CREATE KEYSPACE ks WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}"
    tables:
      t:
        definition: "CREATE TABLE t (a bigint PRIMARY KEY, b text)"
workloads:
  ins:
    ratio: 1
    queries:
      - query: "INSERT INTO t (a, b) VALUES (?, ?)"
        chance: 1.0
"#
    }

    #[test]
    fn parses_minimal_config() {
        let raw: RawRoot = serde_yaml::from_str(minimal_yaml()).unwrap();
        let validated = validate(raw).unwrap();
        assert_eq!(validated.workloads.len(), 1);
        assert_eq!(validated.workloads[0].queries[0].table, "ks@t");
        assert_eq!(validated.workloads[0].queries[0].kind, QueryKind::Insert);
    }

    #[test]
    fn rejects_zero_ratio() {
        let yaml = minimal_yaml().replace("ratio: 1", "ratio: 0");
        let raw: RawRoot = serde_yaml::from_str(&yaml).unwrap();
        assert!(validate(raw).is_err());
    }

    #[test]
    fn rejects_chance_out_of_range() {
        let yaml = minimal_yaml().replace("chance: 1.0", "chance: 2.0");
        let raw: RawRoot = serde_yaml::from_str(&yaml).unwrap();
        assert!(validate(raw).is_err());
    }

    #[test]
    fn rejects_undeclared_table() {
        let yaml = minimal_yaml().replace("INTO t ", "INTO nosuch ");
        let raw: RawRoot = serde_yaml::from_str(&yaml).unwrap();
        assert!(validate(raw).is_err());
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let yaml = format!("{}\nbogus: 1\n", minimal_yaml());
        let result: Result<RawRoot, _> = serde_yaml::from_str(&yaml);
        assert!(result.is_err());
    }
}
