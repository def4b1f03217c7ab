//! Latency log, inserted counters, and watchdog-driven termination (§4.4, §4.6).
//!
//! Grounded on the teacher's `cql-stress-scylla-bench/stats.rs` (`Stats`,
//! `StatsPrinter`, per-second hdr histogram reporting); generalized from a
//! sharded per-thread `Stats` struct into a single mutex-guarded log shared
//! by every LatencyCollector worker, since this crate's per-second bucket
//! boundary (not a thread boundary) is what the Watchdog reads.

use std::collections::HashMap;
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::model::TerminationConfig;
use crate::pipeline::Shutdown;

/// One committed batch of successful-response latencies for a given second.
pub type SecondBatch = Vec<(Duration, String, usize)>;

/// `unix_second -> [(duration, workload_name, query_index)]`, the shared
/// structure every LatencyCollector worker appends to and the Watchdog
/// drains one second at a time.
#[derive(Default)]
pub struct LatencyLog {
    by_second: Mutex<HashMap<u64, SecondBatch>>,
}

impl LatencyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, second: u64, duration: Duration, workload: String, query_index: usize) {
        self.by_second
            .lock()
            .entry(second)
            .or_default()
            .push((duration, workload, query_index));
    }

    /// Removes and returns the batch recorded for `second`, if any. The
    /// Watchdog is the only reader and consumes each second exactly once.
    pub fn take(&self, second: u64) -> Option<SecondBatch> {
        self.by_second.lock().remove(&second)
    }
}

/// Per-table monotonic "rows actually committed" counter (§3), distinct from
/// the scheduling bitmap's attempted-insert count.
#[derive(Default)]
pub struct InsertedCounters {
    by_table: Mutex<HashMap<String, u64>>,
}

impl InsertedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, table: &str) {
        *self.by_table.lock().entry(table.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, table: &str) -> u64 {
        self.by_table.lock().get(table).copied().unwrap_or(0)
    }
}

/// Outcome of one Watchdog evaluation tick, returned so the process bootstrap
/// can print the per-second summary line (§4.10) without the Watchdog
/// needing a `Write` handle of its own.
pub struct TickReport {
    pub second: u64,
    pub operations: u64,
    pub mean: Duration,
    pub p99: Duration,
}

/// Reads the latency log one second at a time, prints a line, and evaluates
/// the two termination conditions plus the optional QPS cap (§4.6).
pub struct Watchdog {
    latency_log: std::sync::Arc<LatencyLog>,
    termination: TerminationConfig,
    shutdown: std::sync::Arc<Shutdown>,
    latency_breaches: u32,
    throughput_decreases: u32,
    previous_count: Option<u64>,
}

impl Watchdog {
    pub fn new(
        latency_log: std::sync::Arc<LatencyLog>,
        termination: TerminationConfig,
        shutdown: std::sync::Arc<Shutdown>,
    ) -> Self {
        Watchdog {
            latency_log,
            termination,
            shutdown,
            latency_breaches: 0,
            throughput_decreases: 0,
            previous_count: None,
        }
    }

    /// Evaluates the entry for `second`, returns `Some(report)` if data was
    /// present, and sets `shutdown` if a termination condition triggered.
    /// Split out of `run` so tests can drive it second-by-second without a
    /// real clock.
    pub fn evaluate(&mut self, second: u64) -> Option<TickReport> {
        let batch = match self.latency_log.take(second) {
            None => {
                info!(second, "no data");
                return None;
            }
            Some(b) => b,
        };

        let count = batch.len() as u64;
        let mut hist = Histogram::<u64>::new(3).expect("valid hdr histogram precision");
        for (d, _, _) in &batch {
            let _ = hist.record(d.as_micros() as u64);
        }
        let mean = Duration::from_micros(hist.mean() as u64);
        let p99 = Duration::from_micros(hist.value_at_quantile(0.99));

        if mean.as_micros() as u64 > self.termination.latency.max {
            self.latency_breaches += 1;
        } else {
            self.latency_breaches = 0;
        }
        if self.latency_breaches >= self.termination.latency.consecutive {
            warn!(second, "latency termination condition reached, shutting down");
            self.shutdown.trigger();
        }

        if let Some(max_qps) = self.termination.queries.max {
            if count > max_qps {
                warn!(second, count, max_qps, "max queries/s exceeded, shutting down");
                self.shutdown.trigger();
            }
        }

        if let Some(prev) = self.previous_count {
            if count < prev {
                self.throughput_decreases += 1;
            } else {
                self.throughput_decreases = 0;
            }
        }
        self.previous_count = Some(count);
        if self.throughput_decreases >= self.termination.queries.consecutive {
            warn!(second, "throughput declined, shutting down");
            self.shutdown.trigger();
        }

        Some(TickReport {
            second,
            operations: count,
            mean,
            p99,
        })
    }

    /// Runs forever, evaluating one second per tick, until `shutdown` is set.
    pub async fn run(mut self, start_second: u64) {
        let mut second = start_second;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = self.shutdown.notified() => break,
            }
            if self.shutdown.is_set() {
                break;
            }
            if let Some(report) = self.evaluate(second) {
                info!(
                    second = report.second,
                    ops = report.operations,
                    mean_us = report.mean.as_micros() as u64,
                    p99_us = report.p99.as_micros() as u64,
                    "tick"
                );
            }
            if self.shutdown.is_set() {
                break;
            }
            second += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LatencyTermination, QueriesTermination};

    fn termination(max_latency_us: u64, consec_latency: u32, consec_queries: u32) -> TerminationConfig {
        TerminationConfig {
            latency: LatencyTermination {
                max: max_latency_us,
                consecutive: consec_latency,
            },
            queries: QueriesTermination {
                max: None,
                consecutive: consec_queries,
            },
        }
    }

    #[test]
    fn latency_termination_after_consecutive_breaches() {
        let log = std::sync::Arc::new(LatencyLog::new());
        let shutdown = std::sync::Arc::new(Shutdown::new());
        let mut watchdog = Watchdog::new(log.clone(), termination(100, 3, 100), shutdown.clone());

        for second in 0..3 {
            log.append(second, Duration::from_micros(500), "ins".into(), 0);
            watchdog.evaluate(second);
            if second < 2 {
                assert!(!shutdown.is_set());
            }
        }
        assert!(shutdown.is_set());
    }

    #[test]
    fn throughput_decline_termination() {
        let log = std::sync::Arc::new(LatencyLog::new());
        let shutdown = std::sync::Arc::new(Shutdown::new());
        let mut watchdog = Watchdog::new(log.clone(), termination(1_000_000, 100, 2), shutdown.clone());

        let counts = [10, 10, 8, 6];
        for (second, &count) in counts.iter().enumerate() {
            for _ in 0..count {
                log.append(second as u64, Duration::from_micros(1), "ins".into(), 0);
            }
            watchdog.evaluate(second as u64);
        }
        assert!(shutdown.is_set());
    }

    #[test]
    fn missing_second_does_not_advance_decrease_counter() {
        let log = std::sync::Arc::new(LatencyLog::new());
        let shutdown = std::sync::Arc::new(Shutdown::new());
        let mut watchdog = Watchdog::new(log.clone(), termination(1_000_000, 100, 2), shutdown.clone());

        log.append(0, Duration::from_micros(1), "ins".into(), 0);
        watchdog.evaluate(0);
        assert!(watchdog.evaluate(1).is_none());
        assert!(!shutdown.is_set());
    }

    #[test]
    fn inserted_counters_are_per_table() {
        let counters = InsertedCounters::new();
        counters.increment("ks@t");
        counters.increment("ks@t");
        counters.increment("ks@u");
        assert_eq!(counters.get("ks@t"), 2);
        assert_eq!(counters.get("ks@u"), 1);
        assert_eq!(counters.get("ks@nosuch"), 0);
    }
}
