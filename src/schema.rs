//! DDL issue and prepared-statement preparation (§4.9).
//!
//! Grounded on the teacher's `settings::create_schema` (DDL issue order) and
//! `operation/user.rs::UserOperationFactory::new` (prepare + cluster
//! metadata lookups to derive generator attributes from a live table's
//! columns).

use anyhow::{Context, Result};

use crate::config::ValidatedConfig;
use crate::db::DbSession;
use crate::hashutil::stable_column_hash;
use crate::model::{
    Attribute, KeyspaceSchema, Level, LoadgenConfig, Query, TableSchema, Workload,
};

/// Issues DDL for every configured keyspace/table, then prepares every
/// configured query and derives its attribute list from the live table's
/// bind-column and key metadata (§4.9). Any failure here is fatal at
/// startup - the process exits before a single worker starts (§4.10).
pub async fn prepare(session: &dyn DbSession, config: ValidatedConfig) -> Result<LoadgenConfig> {
    if config.delete_old {
        for ks in &config.schemata {
            session
                .execute_ddl(&format!("DROP KEYSPACE IF EXISTS {}", ks.name))
                .await
                .with_context(|| format!("failed to drop keyspace {}", ks.name))?;
        }
    }

    for ks in &config.schemata {
        session
            .execute_ddl(&ks.definition)
            .await
            .with_context(|| format!("failed to create keyspace {}", ks.name))?;
        for table in &ks.tables {
            session
                .execute_ddl(&table.definition)
                .await
                .with_context(|| format!("failed to create table {}.{}", ks.name, table.name))?;
        }
    }

    let schemata = config
        .schemata
        .iter()
        .map(|ks| KeyspaceSchema {
            name: ks.name.clone(),
            definition: ks.definition.clone(),
            tables: ks
                .tables
                .iter()
                .map(|t| TableSchema {
                    name: t.name.clone(),
                    definition: t.definition.clone(),
                    distributions: t.distributions.clone(),
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    let mut workloads = Vec::with_capacity(config.workloads.len());
    for w in &config.workloads {
        let mut queries = Vec::with_capacity(w.queries.len());
        for q in &w.queries {
            let query = prepare_query(session, &schemata, q).await?;
            queries.push(query);
        }
        workloads.push(Workload {
            name: w.name.clone(),
            ratio: w.ratio,
            queries,
        });
    }

    Ok(LoadgenConfig {
        database: config.database,
        delete_old: config.delete_old,
        termination: config.termination,
        schemata,
        workloads,
    })
}

async fn prepare_query(
    session: &dyn DbSession,
    schemata: &[KeyspaceSchema],
    q: &crate::config::ValidatedQuery,
) -> Result<Query> {
    let (keyspace, table_name) = q
        .table
        .split_once('@')
        .ok_or_else(|| anyhow::anyhow!("malformed qualified table name {}", q.table))?;

    let distributions = schemata
        .iter()
        .find(|ks| ks.name == keyspace)
        .and_then(|ks| ks.tables.iter().find(|t| t.name == table_name))
        .map(|t| &t.distributions);

    let id = session
        .prepare(&q.cql)
        .await
        .with_context(|| format!("failed to prepare query: {}", q.cql))?;
    let bind_columns = session
        .bind_columns(id)
        .await
        .with_context(|| format!("failed to read bind columns for: {}", q.cql))?;
    let (partition_cols, clustering_cols) = session
        .key_columns(keyspace, table_name)
        .await
        .with_context(|| format!("failed to read key columns for {}", q.table))?;

    let attributes = bind_columns
        .into_iter()
        .map(|(col_name, type_tag)| {
            let level = if partition_cols.iter().any(|c| c == &col_name) {
                Level::Partition
            } else if clustering_cols.iter().any(|c| c == &col_name) {
                Level::Cluster
            } else {
                Level::Attribute
            };
            let args = distributions
                .and_then(|d| d.get(&col_name))
                .cloned()
                .unwrap_or_default();
            let column_hash = stable_column_hash(&format!("{}.{col_name}", q.table));
            Attribute {
                type_tag,
                level,
                args,
                column_hash,
                column_name: col_name,
            }
        })
        .collect();

    Ok(Query {
        cql: q.cql.clone(),
        table: q.table.clone(),
        kind: q.kind,
        chance: q.chance,
        attributes,
        prepared: Some(id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ValidatedKeyspace, ValidatedQuery, ValidatedTable, ValidatedWorkload};
    use crate::db::fake_session::{AlwaysSucceeds, FakeDbSession};
    use crate::model::{DatabaseConfig, DatabaseKind, LatencyTermination, QueriesTermination, QueryKind, TerminationConfig};

    fn minimal_config() -> ValidatedConfig {
        ValidatedConfig {
            database: DatabaseConfig {
                kind: DatabaseKind::Cassandra,
                connection_arguments: serde_yaml::Mapping::new(),
            },
            delete_old: true,
            termination: TerminationConfig {
                latency: LatencyTermination { max: 1_000_000, consecutive: 5 },
                queries: QueriesTermination { max: None, consecutive: 5 },
            },
            schemata: vec![ValidatedKeyspace {
                name: "ks".into(),
                definition: "CREATE KEYSPACE ks WITH REPLICATION = {}".into(),
                tables: vec![ValidatedTable {
                    name: "t".into(),
                    definition: "CREATE TABLE t (a bigint PRIMARY KEY, b text)".into(),
                    distributions: Default::default(),
                }],
            }],
            workloads: vec![ValidatedWorkload {
                name: "ins".into(),
                ratio: 1,
                queries: vec![ValidatedQuery {
                    cql: "INSERT INTO t (a, b) VALUES (?, ?)".into(),
                    table: "ks@t".into(),
                    kind: QueryKind::Insert,
                    chance: 1.0,
                }],
            }],
        }
    }

    #[tokio::test]
    async fn derives_attribute_levels_from_key_columns() {
        let session = FakeDbSession::new(AlwaysSucceeds)
            .with_columns(vec![("a".into(), "bigint".into()), ("b".into(), "text".into())])
            .with_keys("ks", "t", vec!["a".into()], vec![]);

        let resolved = prepare(&session, minimal_config()).await.unwrap();
        let query = &resolved.workloads[0].queries[0];
        assert_eq!(query.attributes.len(), 2);
        assert_eq!(query.attributes[0].level, Level::Partition);
        assert_eq!(query.attributes[1].level, Level::Attribute);
    }
}
