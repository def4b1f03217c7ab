//! Database-session seam (§4.9, §6 "Non-goals: database client library").
//!
//! `DbSession` is the one trait object boundary between the pipeline and a
//! concrete transport. Grounded on the teacher's `test_util.rs`, which
//! already treats session construction as the one place worth abstracting
//! for tests; generalized here into a full async-trait seam so a
//! deterministic fake can stand in for a live cluster in tests (§8).
//!
//! Prepared statements are referred to by an opaque `PreparedStatementId`
//! (an index into a `Vec` the session owns) rather than by a boxed trait
//! object, since the real `scylla::statement::prepared::PreparedStatement`
//! is a concrete, `Send + Sync` type we can simply store and hand back a
//! handle to - no need to smuggle it through a trait-object seam.

pub mod fake_session;
pub mod scylla_session;

use scylla::value::CqlValue;

/// Opaque handle to a statement prepared against a session. Never
/// constructed outside of `DbSession::prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreparedStatementId(pub usize);

/// Outcome of executing one query, timed by the caller (the QueryDispatcher
/// records `submit_timestamp`; the LatencyCollector computes latency from
/// the token's arrival time, §4.3/§4.4).
pub type ExecResult = anyhow::Result<()>;

#[async_trait]
pub trait DbSession: Send + Sync {
    /// Issues a DDL/control statement directly (CREATE KEYSPACE, DROP
    /// KEYSPACE, CREATE TABLE, ...), used only during schema preparation.
    async fn execute_ddl(&self, cql: &str) -> anyhow::Result<()>;

    /// Prepares `cql` and returns a handle to it.
    async fn prepare(&self, cql: &str) -> anyhow::Result<PreparedStatementId>;

    /// Looks up the bind-variable column names (in positional order) and
    /// their CQL type tags for a prepared statement, used by the schema
    /// layer to derive `Attribute`s (§4.9).
    async fn bind_columns(&self, id: PreparedStatementId) -> anyhow::Result<Vec<(String, String)>>;

    /// Looks up a table's partition-key and clustering-key column names (in
    /// declared order), used by the schema layer to assign each bind column
    /// its §3 `Level` (partition / cluster / attribute).
    async fn key_columns(&self, keyspace: &str, table: &str) -> anyhow::Result<(Vec<String>, Vec<String>)>;

    /// Executes the prepared statement with the given bound values.
    async fn execute(&self, id: PreparedStatementId, values: Vec<CqlValue>) -> ExecResult;
}
