//! The five-stage concurrent generator pipeline (§4.1-§4.6) plus the shared
//! queue/shutdown plumbing every stage is built on.
//!
//! Grounded on the teacher's `run.rs` (`RunController`/`WorkerContext`,
//! `FuturesUnordered` worker pool, rate limiter) for the worker-pool shape,
//! generalized from one homogeneous worker class into five distinct stages
//! joined by bounded channels, per the expanded runtime model (§5).

pub mod collector;
pub mod dispatcher;
pub mod fabricator;
pub mod selector;
pub mod supervisor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use scylla::value::CqlValue;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};

use crate::db::PreparedStatementId;
use crate::model::QueryKind;
use crate::scheduler::ScheduledAttribute;

/// Target capacity T of every inter-stage queue (§2).
pub const TARGET_QUEUE_CAPACITY: usize = 256;
/// Global cap on worker count per stage class (§4.5).
pub const MAX_WORKERS_PER_CLASS: usize = 8;
/// Supervisor scaling-decision cadence (§4.5 "approximately 1s").
pub const SUPERVISOR_TICK: Duration = Duration::from_secs(1);
/// Small cancellable wait used by a worker when its output queue is full
/// (the `ε` of the §4.5 worker-loop protocol).
pub const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Queue-dwell threshold beyond which a response token sitting in the
/// response queue signals an overloaded LatencyCollector even though the
/// queue itself isn't full (§4.4 step 1, §7 `QueueDwellTooLong`).
pub const COLLECTOR_DWELL_THRESHOLD: Duration = Duration::from_millis(500);

/// Cooperative shutdown flag plus a `Notify` so any waiter - worker poll
/// loop, Supervisor tick, Watchdog tick - wakes immediately instead of
/// discovering the flag only on its next poll (§5 "Cancellation").
#[derive(Default)]
pub struct Shutdown {
    flag: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Raised by a worker that observes its own stage overloaded by a measure
/// other than queue length - currently the LatencyCollector's response-token
/// dwell time (§4.4 step 1) - and drained by the Supervisor on its next tick
/// to decide whether to scale that stage up. A plain flag rather than a
/// count: one overloaded tick is enough to justify spawning a worker, and
/// the Supervisor only samples at `SUPERVISOR_TICK` cadence anyway.
#[derive(Default)]
pub struct ScalingSignal {
    flag: AtomicBool,
}

impl ScalingSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Reads and clears the signal in one step, so a tick that acts on it
    /// doesn't see the same raise again next tick.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::Relaxed)
    }
}

/// One query within a selected workload, carrying everything the
/// DataFabricator and QueryDispatcher need that the scheduler itself doesn't
/// track (the prepared-statement handle and the query's position for the
/// eventual response token).
pub struct PipelineQuery {
    pub query_index: usize,
    pub kind: QueryKind,
    pub table: String,
    pub prepared: PreparedStatementId,
    pub attributes: Vec<ScheduledAttribute>,
}

/// WorkloadSelector's output (`selected-workload` in §2's data-flow diagram).
pub struct SelectedItem {
    pub workload_name: String,
    pub queries: Vec<PipelineQuery>,
}

pub struct BoundQuery {
    pub query_index: usize,
    pub kind: QueryKind,
    pub table: String,
    pub prepared: PreparedStatementId,
    pub values: Vec<CqlValue>,
}

/// DataFabricator's output (`bound-values`).
pub struct BoundItem {
    pub workload_name: String,
    pub queries: Vec<BoundQuery>,
}

/// QueryDispatcher's output (`pending-response`, §4.3). Constructed by the
/// task the dispatcher spawns to await the request, never by the
/// dispatcher's own loop, so one slow request never blocks the next item
/// from being picked up - see `dispatcher.rs`.
pub struct ResponseToken {
    pub workload_name: String,
    pub query_index: usize,
    pub table: String,
    pub kind: QueryKind,
    pub submit_timestamp: Instant,
    pub latency: Duration,
    pub result: anyhow::Result<()>,
}

pub type SelectedTx = mpsc::Sender<SelectedItem>;
pub type SelectedRx = Arc<AsyncMutex<mpsc::Receiver<SelectedItem>>>;
pub type BoundTx = mpsc::Sender<BoundItem>;
pub type BoundRx = Arc<AsyncMutex<mpsc::Receiver<BoundItem>>>;
pub type ResponseTx = mpsc::Sender<ResponseToken>;
pub type ResponseRx = Arc<AsyncMutex<mpsc::Receiver<ResponseToken>>>;

/// Current queue occupancy derived from a `Sender`'s capacity introspection
/// (§5 runtime expansion), used by the Supervisor to decide when a stage's
/// input is running dry or backing up.
pub fn queue_len<T>(tx: &mpsc::Sender<T>) -> usize {
    tx.max_capacity() - tx.capacity()
}
