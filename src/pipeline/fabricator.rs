//! DataFabricator worker (§4.2, §4.5).
//!
//! Purely CPU-bound: every attribute is generated from an explicit seed, so
//! fabricators hold no state between items and any worker can take any item
//! off the queue.

use std::sync::Arc;

use tracing::error;

use crate::generators::GeneratorRegistry;

use super::{BoundItem, BoundQuery, BoundTx, SelectedRx, Shutdown, WORKER_POLL_INTERVAL};

pub async fn run(
    registry: Arc<GeneratorRegistry>,
    rx: SelectedRx,
    tx: BoundTx,
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

        let mut queries = Vec::with_capacity(item.queries.len());
        let mut fatal = false;
        for q in item.queries {
            let mut values = Vec::with_capacity(q.attributes.len());
            for attr in &q.attributes {
                match registry.generate(&attr.type_tag, attr.seed, &attr.args) {
                    Ok(v) => values.push(v),
                    Err(e) => {
                        error!(error = %e, type_tag = %attr.type_tag, "value generation failed, shutting down");
                        fatal = true;
                        break;
                    }
                }
            }
            if fatal {
                break;
            }
            queries.push(BoundQuery {
                query_index: q.query_index,
                kind: q.kind,
                table: q.table,
                prepared: q.prepared,
                values,
            });
        }

        if fatal {
            shutdown.trigger();
            break;
        }

        let bound = BoundItem {
            workload_name: item.workload_name,
            queries,
        };
        if tx.send(bound).await.is_err() {
            break;
        }
    }
}
