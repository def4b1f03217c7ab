//! WorkloadSelector worker (§4.1, §4.5).
//!
//! Stateless beyond the shared `TableStates` registry: any worker in the
//! pool can service any draw, which is what lets the Supervisor scale this
//! stage up under load without coordination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::model::LoadgenConfig;
use crate::rng::Seeded;
use crate::scheduler::{self, TableStates};

use super::{PipelineQuery, SelectedItem, SelectedTx, Shutdown, WORKER_POLL_INTERVAL};

pub async fn run(
    config: Arc<LoadgenConfig>,
    states: Arc<Mutex<TableStates>>,
    tx: SelectedTx,
    shutdown: Arc<Shutdown>,
    seed_source: Arc<AtomicU64>,
) {
    let ratio_sum = config.ratio_sum();

    loop {
        if shutdown.is_set() {
            break;
        }
        if tx.capacity() == 0 {
            tokio::time::sleep(WORKER_POLL_INTERVAL).await;
            continue;
        }

        let draw_seed = seed_source.fetch_add(1, Ordering::Relaxed);
        let mut rng = Seeded::new(draw_seed);
        let workload = scheduler::select_workload(&mut rng, &config.workloads, ratio_sum);

        let scheduled = {
            let mut guard = states.lock();
            scheduler::schedule_workload(workload, &mut guard, draw_seed)
        };

        let scheduled = match scheduled {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "workload scheduling failed, shutting down");
                shutdown.trigger();
                break;
            }
        };

        let queries: Vec<PipelineQuery> = scheduled
            .queries
            .into_iter()
            .zip(workload.queries.iter())
            .enumerate()
            .map(|(i, (sq, original))| PipelineQuery {
                query_index: i,
                kind: sq.kind,
                table: sq.table,
                prepared: original
                    .prepared
                    .expect("schema::prepare always fills in a prepared-statement handle"),
                attributes: sq.attributes,
            })
            .collect();

        let item = SelectedItem {
            workload_name: scheduled.workload_name,
            queries,
        };

        if tx.send(item).await.is_err() {
            break;
        }
    }
}
