//! Deterministic in-memory `DbSession` for tests (§8).
//!
//! Grounded on the teacher's `test_util::new_test_session` being the one
//! place session construction is already treated as swappable; generalized
//! into a full fake that can simulate per-request latency and failure
//! patterns so the Watchdog termination scenarios (S5/S6) can be driven
//! without a live cluster.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use scylla::value::CqlValue;

use super::{DbSession, PreparedStatementId};

/// Injected per-request behavior a test wants the fake session to simulate.
pub trait FakeResponsePolicy: Send + Sync {
    /// Returns `Ok(latency)` to simulate a successful response after
    /// sleeping `latency`, or `Err(..)` to simulate a failed request.
    fn next_response(&self, call_index: u64) -> Result<Duration>;
}

/// Always succeeds immediately - the "perfect fake DB" of S1/S2/S4.
pub struct AlwaysSucceeds;

impl FakeResponsePolicy for AlwaysSucceeds {
    fn next_response(&self, _call_index: u64) -> Result<Duration> {
        Ok(Duration::ZERO)
    }
}

/// Always reports a fixed latency - used to drive S5 (latency termination).
pub struct FixedLatency(pub Duration);

impl FakeResponsePolicy for FixedLatency {
    fn next_response(&self, _call_index: u64) -> Result<Duration> {
        Ok(self.0)
    }
}

/// Reports latency that grows with every call, monotonically reducing
/// achievable throughput - used to drive S6 (throughput-decline termination).
pub struct DecliningThroughput {
    pub base: Duration,
    pub step: Duration,
}

impl FakeResponsePolicy for DecliningThroughput {
    fn next_response(&self, call_index: u64) -> Result<Duration> {
        Ok(self.base + self.step * (call_index as u32))
    }
}

/// In-memory `DbSession`: DDL/prepare are no-ops that just hand out
/// incrementing ids, and `execute` defers to the configured
/// `FakeResponsePolicy` rather than touching any real transport.
pub struct FakeDbSession {
    policy: Box<dyn FakeResponsePolicy>,
    prepared_count: AtomicU64,
    bind_columns_by_id: Mutex<Vec<Vec<(String, String)>>>,
    /// `(keyspace, table) -> (partition_key_columns, clustering_key_columns)`,
    /// configured per-test instead of looked up from a live cluster.
    keys_by_table: Mutex<std::collections::HashMap<(String, String), (Vec<String>, Vec<String>)>>,
    call_counter: AtomicU64,
    pub executed: AtomicU64,
    pub failed: AtomicU64,
}

impl FakeDbSession {
    pub fn new(policy: impl FakeResponsePolicy + 'static) -> Self {
        FakeDbSession {
            policy: Box::new(policy),
            prepared_count: AtomicU64::new(0),
            bind_columns_by_id: Mutex::new(Vec::new()),
            keys_by_table: Mutex::new(std::collections::HashMap::new()),
            call_counter: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Registers the bind-column metadata a test wants `bind_columns` to
    /// report for the next `prepare` call, in declaration order.
    pub fn with_columns(self, columns: Vec<(String, String)>) -> Self {
        self.bind_columns_by_id.lock().unwrap().push(columns);
        self
    }

    /// Registers the partition/clustering key column names a test wants
    /// `key_columns` to report for a given table.
    pub fn with_keys(
        self,
        keyspace: &str,
        table: &str,
        partition: Vec<String>,
        clustering: Vec<String>,
    ) -> Self {
        self.keys_by_table
            .lock()
            .unwrap()
            .insert((keyspace.to_string(), table.to_string()), (partition, clustering));
        self
    }
}

#[async_trait]
impl DbSession for FakeDbSession {
    async fn execute_ddl(&self, _cql: &str) -> Result<()> {
        Ok(())
    }

    async fn prepare(&self, _cql: &str) -> Result<PreparedStatementId> {
        let id = self.prepared_count.fetch_add(1, Ordering::SeqCst);
        Ok(PreparedStatementId(id as usize))
    }

    async fn bind_columns(&self, id: PreparedStatementId) -> Result<Vec<(String, String)>> {
        let guard = self.bind_columns_by_id.lock().unwrap();
        Ok(guard.get(id.0).cloned().unwrap_or_default())
    }

    async fn key_columns(&self, keyspace: &str, table: &str) -> Result<(Vec<String>, Vec<String>)> {
        Ok(self
            .keys_by_table
            .lock()
            .unwrap()
            .get(&(keyspace.to_string(), table.to_string()))
            .cloned()
            .unwrap_or_else(|| (vec!["a".to_string()], vec![])))
    }

    async fn execute(&self, _id: PreparedStatementId, _values: Vec<CqlValue>) -> Result<()> {
        let call_index = self.call_counter.fetch_add(1, Ordering::SeqCst);
        match self.policy.next_response(call_index) {
            Ok(latency) => {
                if latency > Duration::ZERO {
                    tokio::time::sleep(latency).await;
                }
                self.executed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds_reports_success() {
        let fake = FakeDbSession::new(AlwaysSucceeds);
        let id = fake.prepare("SELECT 1").await.unwrap();
        fake.execute(id, vec![]).await.unwrap();
        assert_eq!(fake.executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declining_throughput_increases_latency() {
        let fake = FakeDbSession::new(DecliningThroughput {
            base: Duration::from_millis(1),
            step: Duration::from_millis(1),
        });
        let first = fake.policy.next_response(0).unwrap();
        let second = fake.policy.next_response(1).unwrap();
        assert!(second > first);
    }
}
