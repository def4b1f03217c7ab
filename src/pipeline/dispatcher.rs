//! QueryDispatcher worker (§4.3, §4.5).
//!
//! Dispatcher workers share one `Arc<dyn DbSession>` rather than opening a
//! session per worker: the underlying `scylla::Session` already pools
//! connections (one per shard) internally and is `Send + Sync`, matching the
//! teacher's own `main.rs`, which builds a single `Arc<Session>` and clones
//! it into every worker task rather than reconnecting per task.
//!
//! Submission itself must not block this loop (§4.3): a query's request is
//! fired from a detached task, so one slow request never holds up the next
//! item waiting in `rx`. Backpressure still applies - the detached task
//! reserves its response-queue slot *before* the request is sent, so a full
//! response queue blocks new submissions exactly the way a bounded channel
//! should, without serializing them behind each other's latency.

use std::sync::Arc;
use std::time::Instant;

use crate::db::DbSession;

use super::{BoundRx, ResponseToken, ResponseTx, Shutdown, WORKER_POLL_INTERVAL};

pub async fn run(
    session: Arc<dyn DbSession>,
    rx: BoundRx,
    tx: ResponseTx,
    shutdown: Arc<Shutdown>,
) {
    loop {
        if shutdown.is_set() {
            break;
        }
        if tx.capacity() == 0 {
            tokio::time::sleep(WORKER_POLL_INTERVAL).await;
            continue;
        }

        let item = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        let item = match item {
            Some(i) => i,
            None => break,
        };

        for q in item.queries {
            let permit = match tx.clone().reserve_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let session = session.clone();
            let workload_name = item.workload_name.clone();

            tokio::spawn(async move {
                let submit_timestamp = Instant::now();
                let result = session.execute(q.prepared, q.values).await;
                let latency = submit_timestamp.elapsed();

                permit.send(ResponseToken {
                    workload_name,
                    query_index: q.query_index,
                    table: q.table,
                    kind: q.kind,
                    submit_timestamp,
                    latency,
                    result,
                });
            });
        }
    }
}
