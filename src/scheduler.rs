//! WorkloadSelector scheduling algorithm (§4.1).
//!
//! This is the one place allowed to touch `TableKeyState` mutably; every
//! other stage only ever sees the seeds this module hands out.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LoadgenError;
use crate::keystate::{KeyFlags, TableKeyState};
use crate::model::{Level, Query, QueryKind, Workload};
use crate::rng::Seeded;

/// Registry of per-table reproducible state, keyed by the qualified table
/// name (`ks@table`, matching `Query::table`).
#[derive(Default)]
pub struct TableStates {
    tables: HashMap<String, Arc<TableKeyState>>,
}

impl TableStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, table: &str) -> Arc<TableKeyState> {
        self.tables
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(TableKeyState::new()))
            .clone()
    }
}

/// The three seeds computed for a query decision (§3, §4.1).
#[derive(Debug, Clone, Copy)]
pub struct SeedTriple {
    pub partition_seed: u64,
    pub cluster_seed: u64,
    pub update_seed: u64,
}

/// One scheduled attribute ready for the DataFabricator: its type tag, the
/// final seed (level seed + column hash), and its generator args.
#[derive(Debug, Clone)]
pub struct ScheduledAttribute {
    pub type_tag: String,
    pub seed: u64,
    pub args: crate::model::GeneratorArgs,
}

/// A scheduled query: its kind and the resolved attribute seeds, ready to be
/// handed to the DataFabricator.
#[derive(Debug, Clone)]
pub struct ScheduledQuery {
    pub kind: QueryKind,
    pub table: String,
    pub attributes: Vec<ScheduledAttribute>,
}

#[derive(Debug, Clone)]
pub struct ScheduledWorkload {
    pub workload_name: String,
    pub queries: Vec<ScheduledQuery>,
}

/// Picks a workload by weighted ratio: draws `r` uniformly in `[0,
/// ratio_sum)` and returns the workload whose cumulative boundary is the
/// greatest `<= r`.
pub fn select_workload<'a>(rng: &mut Seeded, workloads: &'a [Workload], ratio_sum: u64) -> &'a Workload {
    assert!(ratio_sum > 0, "ratio_sum must be positive");
    let r = rng.uniform_int(0, ratio_sum);
    let mut cumulative = 0u64;
    for w in workloads {
        cumulative += w.ratio as u64;
        if r < cumulative {
            return w;
        }
    }
    workloads.last().expect("workloads must be non-empty")
}

/// Computes the seed triple for a single query against its table's state,
/// mutating the table state as a side effect (append for insert, flag
/// updates for update/delete). This is the read-decide-append transaction of
/// §4.1 and runs under the table's single mutex acquisition.
///
/// `decision_seed` identifies this particular scheduling decision (distinct
/// from `n`, the table's current length) and only feeds the select/update/
/// delete candidate draw - insert still reseeds from `n` per §4.1.
pub(crate) fn schedule_seeds(
    query: &Query,
    state: &TableKeyState,
    decision_seed: u64,
) -> Result<SeedTriple, LoadgenError> {
    match query.kind {
        QueryKind::Insert => Ok(state.with_lock(|h| {
            let n = h.len();
            let cluster_seed = n;
            let mut partition_seed = n;

            let mut rng = Seeded::new(n);
            let x = rng.uniform();
            let new_partition = x >= query.chance;

            if new_partition && n > 0 {
                loop {
                    let p = rng.uniform_int(0, n);
                    if p == 0 || h.is_primary(p) {
                        partition_seed = p;
                        break;
                    }
                }
            }

            let is_primary = !new_partition || cluster_seed == partition_seed;
            h.append(KeyFlags {
                is_primary,
                was_updated: false,
                was_deleted: false,
            });

            SeedTriple {
                partition_seed,
                cluster_seed,
                update_seed: cluster_seed,
            }
        })),
        QueryKind::Select | QueryKind::Update | QueryKind::Delete => {
            state.with_lock(|h| {
                let n = h.len();
                if n == 0 {
                    // Nothing has ever been inserted; there is no row to act on.
                    // The caller's query mix is presumably paired with inserts
                    // that run first, but guard against the degenerate case
                    // rather than indexing out of bounds.
                    return Err(LoadgenError::GeneratorExhausted {
                        requested: 1,
                        attempts: 0,
                    });
                }

                let c = if n <= 1 {
                    0
                } else {
                    // Reseeded from this decision's own seed, never from `n`:
                    // `n` is invariant across consecutive select/update/delete
                    // calls at a fixed table size, which would make every
                    // such call draw the identical row.
                    let mut rng = Seeded::new(decision_seed);
                    loop {
                        let candidate = rng.uniform_int(0, n);
                        if !h.was_deleted(candidate) {
                            break candidate;
                        }
                    }
                };

                let partition_seed = if h.is_primary(c) {
                    c
                } else {
                    let mut rng = Seeded::new(c);
                    let _burned = rng.uniform(); // replays the original chance roll
                    loop {
                        let p = rng.uniform_int(0, c);
                        if p == 0 || h.is_primary(p) {
                            break p;
                        }
                    }
                };

                let existing_update_seed = h.update_seed_of(c).unwrap_or(c);

                match query.kind {
                    QueryKind::Update => {
                        let next = crate::rng::lcg(existing_update_seed);
                        h.mark_updated(c, next);
                    }
                    QueryKind::Delete => {
                        h.mark_deleted(c);
                    }
                    QueryKind::Select => {}
                    QueryKind::Insert => unreachable!(),
                }

                Ok(SeedTriple {
                    partition_seed,
                    cluster_seed: c,
                    update_seed: existing_update_seed,
                })
            })
        }
    }
}

fn base_seed(triple: &SeedTriple, level: Level) -> u64 {
    match level {
        Level::Partition => triple.partition_seed,
        Level::Cluster => triple.cluster_seed,
        Level::Attribute => triple.update_seed,
    }
}

/// Schedules every query of a workload against its table's state, producing
/// the attribute seeds the DataFabricator will consume. `decision_seed`
/// identifies this scheduling decision (e.g. the caller's per-draw counter);
/// each query within the workload gets its own derived seed so multiple
/// selects against the same table in one workload don't collide.
pub fn schedule_workload(
    workload: &Workload,
    states: &mut TableStates,
    decision_seed: u64,
) -> Result<ScheduledWorkload, LoadgenError> {
    let mut queries = Vec::with_capacity(workload.queries.len());
    for (i, query) in workload.queries.iter().enumerate() {
        let state = states.get_or_create(&query.table);
        let query_seed = decision_seed.rotate_left(11) ^ (i as u64).wrapping_mul(0x9E3779B97F4A7C15);
        let triple = schedule_seeds(query, &state, query_seed)?;

        let attributes = query
            .attributes
            .iter()
            .map(|attr| ScheduledAttribute {
                type_tag: attr.type_tag.clone(),
                seed: base_seed(&triple, attr.level).wrapping_add(attr.column_hash),
                args: attr.args.clone(),
            })
            .collect();

        queries.push(ScheduledQuery {
            kind: query.kind,
            table: query.table.clone(),
            attributes,
        });
    }

    Ok(ScheduledWorkload {
        workload_name: workload.name.clone(),
        queries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, GeneratorArgs};

    fn insert_query(table: &str, chance: f64) -> Query {
        Query {
            cql: "INSERT INTO t(a) VALUES (?)".into(),
            table: table.into(),
            kind: QueryKind::Insert,
            chance,
            attributes: vec![Attribute {
                type_tag: "bigint".into(),
                level: Level::Partition,
                args: GeneratorArgs::new(),
                column_hash: 0,
                column_name: "a".into(),
            }],
            prepared: None,
        }
    }

    fn select_query(table: &str) -> Query {
        Query {
            cql: "SELECT * FROM t WHERE a = ?".into(),
            table: table.into(),
            kind: QueryKind::Select,
            chance: 1.0,
            attributes: vec![],
            prepared: None,
        }
    }

    #[test]
    fn insert_ordinals_are_gapless() {
        let state = TableKeyState::new();
        let q = insert_query("ks@t", 1.0);
        for i in 0..1000u64 {
            let triple = schedule_seeds(&q, &state, i).unwrap();
            assert_eq!(triple.cluster_seed, i);
            assert!(state.flags(i).is_primary);
        }
    }

    #[test]
    fn select_never_returns_deleted_ordinal() {
        let state = TableKeyState::new();
        let insert = insert_query("ks@t", 1.0);
        for i in 0..10 {
            schedule_seeds(&insert, &state, i).unwrap();
        }
        state.mark_deleted(5);

        let select = select_query("ks@t");
        let mut seen = std::collections::HashSet::new();
        for seed in 0..5000u64 {
            let triple = schedule_seeds(&select, &state, seed).unwrap();
            assert_ne!(triple.cluster_seed, 5);
            seen.insert(triple.cluster_seed);
        }
        // A fixed table size must not collapse every decision onto the same
        // row: the draw is reseeded per-decision, not from `n`.
        assert!(seen.len() > 1, "select draws never varied across decisions");
    }

    #[test]
    fn update_chain_follows_lcg() {
        let state = TableKeyState::new();
        let insert = insert_query("ks@t", 1.0);
        for i in 0..5 {
            schedule_seeds(&insert, &state, i).unwrap();
        }

        // Force the cluster key to 2 for each update by retrying until the
        // scheduler's internal draw lands there is awkward (it's randomized),
        // so directly exercise the update_dict chaining via mark_updated,
        // mirroring what schedule_seeds does internally.
        let mut expected = crate::rng::lcg(2);
        state.mark_updated(2, expected);
        for _ in 0..2 {
            expected = crate::rng::lcg(expected);
            state.mark_updated(2, expected);
        }
        assert_eq!(state.update_seed_of(2), Some(expected));
        assert_eq!(
            expected,
            crate::rng::lcg(crate::rng::lcg(crate::rng::lcg(2)))
        );
    }

    #[test]
    fn ratio_selection_converges() {
        let workloads = vec![
            Workload { name: "a".into(), ratio: 1, queries: vec![] },
            Workload { name: "b".into(), ratio: 3, queries: vec![] },
        ];
        let sum = 4u64;
        let mut counts = [0u64; 2];
        let mut rng = Seeded::new(777);
        for _ in 0..100_000 {
            let w = select_workload(&mut rng, &workloads, sum);
            if w.name == "a" {
                counts[0] += 1;
            } else {
                counts[1] += 1;
            }
        }
        let frac_a = counts[0] as f64 / 100_000.0;
        assert!((frac_a - 0.25).abs() < 0.01, "frac_a = {frac_a}");
    }
}
