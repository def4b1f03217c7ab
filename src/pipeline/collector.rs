//! LatencyCollector worker (§4.4, §4.5).
//!
//! Classifies each response, commits successful latencies into the shared
//! per-second log under its own short-lived lock, and maintains each
//! table's Inserted counter. Unlike the teacher's sharded per-thread `Stats`
//! (merged only on demand), this crate commits straight into one shared log
//! since the Watchdog needs the *previous* second's data on every tick, not
//! a periodically-merged snapshot.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use std::sync::Arc;
use tracing::warn;

use crate::model::QueryKind;
use crate::stats::{InsertedCounters, LatencyLog};

use super::{ResponseRx, ScalingSignal, Shutdown, COLLECTOR_DWELL_THRESHOLD};

pub async fn run(
    latency_log: Arc<LatencyLog>,
    inserted: Arc<InsertedCounters>,
    rx: ResponseRx,
    shutdown: Arc<Shutdown>,
    dwell_signal: Arc<ScalingSignal>,
) {
    loop {
        if shutdown.is_set() {
            break;
        }

        let token = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        let token = match token {
            Some(t) => t,
            None => break,
        };

        // §4.4 step 1's other half: a queue can stay far from full while the
        // few items it holds each dwell too long (a slow collector), which
        // queue-length alone would never catch.
        if Instant::now().saturating_duration_since(token.submit_timestamp) >= COLLECTOR_DWELL_THRESHOLD {
            dwell_signal.raise();
        }

        let is_insert = token.kind == QueryKind::Insert;
        match token.result {
            Ok(()) => {
                let second = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                latency_log.append(second, token.latency, token.workload_name, token.query_index);
                if is_insert {
                    inserted.increment(&token.table);
                }
            }
            Err(e) => {
                if is_insert {
                    // The bitmap already grew for this attempt (§4.1), so the
                    // ordinal space can run ahead of what the DB actually
                    // holds - an accepted approximation (§9(c)).
                    warn!(error = %e, table = %token.table, "insert failed");
                }
            }
        }
    }
}
