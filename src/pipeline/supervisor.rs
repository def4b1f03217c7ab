//! Supervisor (§4.5): builds the channel topology, spawns the initial worker
//! per class plus the Watchdog, and runs the scaling/shutdown loop.
//!
//! Grounded on the teacher's `run.rs::RunController`, which owns the worker
//! pool and drives it to completion via `FuturesUnordered`; generalized from
//! one homogeneous pool into four distinct stage pools plus the Watchdog,
//! scaled independently per §4.5's rules.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::db::DbSession;
use crate::generators::GeneratorRegistry;
use crate::model::LoadgenConfig;
use crate::scheduler::TableStates;
use crate::stats::{InsertedCounters, LatencyLog, Watchdog};

use super::{
    collector, dispatcher, fabricator, queue_len, selector, BoundItem, ResponseToken, ScalingSignal,
    SelectedItem, Shutdown, MAX_WORKERS_PER_CLASS, SUPERVISOR_TICK, TARGET_QUEUE_CAPACITY,
};

/// Final worker counts, reported once the pipeline has fully shut down.
pub struct RunSummary {
    pub selector_workers: usize,
    pub fabricator_workers: usize,
    pub dispatcher_workers: usize,
    pub collector_workers: usize,
}

/// Runs the whole pipeline to completion. Returns once every worker has
/// joined after `shutdown` is set (by the Watchdog, by a fatal worker error,
/// or by the caller).
pub async fn run(
    config: Arc<LoadgenConfig>,
    session: Arc<dyn DbSession>,
    shutdown: Arc<Shutdown>,
) -> RunSummary {
    let table_states = Arc::new(SyncMutex::new(TableStates::new()));
    let latency_log = Arc::new(LatencyLog::new());
    let inserted = Arc::new(InsertedCounters::new());
    run_with_shared_state(config, session, shutdown, table_states, latency_log, inserted).await
}

/// Same as [`run`], but with the shared scheduling/observability state
/// supplied by the caller instead of created fresh - lets tests hold onto
/// an `Arc` clone of `table_states`/`inserted`/`latency_log` to assert on
/// after the pipeline shuts down (§8 S1-S6).
pub async fn run_with_shared_state(
    config: Arc<LoadgenConfig>,
    session: Arc<dyn DbSession>,
    shutdown: Arc<Shutdown>,
    table_states: Arc<SyncMutex<TableStates>>,
    latency_log: Arc<LatencyLog>,
    inserted: Arc<InsertedCounters>,
) -> RunSummary {
    let (selected_tx, selected_rx) = tokio::sync::mpsc::channel::<SelectedItem>(TARGET_QUEUE_CAPACITY);
    let (bound_tx, bound_rx) = tokio::sync::mpsc::channel::<BoundItem>(TARGET_QUEUE_CAPACITY);
    let (response_tx, response_rx) =
        tokio::sync::mpsc::channel::<ResponseToken>(TARGET_QUEUE_CAPACITY);

    let selected_rx = Arc::new(AsyncMutex::new(selected_rx));
    let bound_rx = Arc::new(AsyncMutex::new(bound_rx));
    let response_rx = Arc::new(AsyncMutex::new(response_rx));

    let registry = Arc::new(GeneratorRegistry::with_defaults());
    let seed_source = Arc::new(AtomicU64::new(0));
    let collector_dwell_signal = Arc::new(ScalingSignal::new());

    let mut selector_handles: Vec<JoinHandle<()>> = Vec::new();
    let mut fabricator_handles: Vec<JoinHandle<()>> = Vec::new();
    let mut dispatcher_handles: Vec<JoinHandle<()>> = Vec::new();
    let mut collector_handles: Vec<JoinHandle<()>> = Vec::new();

    let spawn_selector = |handles: &mut Vec<JoinHandle<()>>| {
        handles.push(tokio::spawn(selector::run(
            config.clone(),
            table_states.clone(),
            selected_tx.clone(),
            shutdown.clone(),
            seed_source.clone(),
        )));
    };
    let spawn_fabricator = |handles: &mut Vec<JoinHandle<()>>| {
        handles.push(tokio::spawn(fabricator::run(
            registry.clone(),
            selected_rx.clone(),
            bound_tx.clone(),
            shutdown.clone(),
        )));
    };
    let spawn_dispatcher = |handles: &mut Vec<JoinHandle<()>>| {
        handles.push(tokio::spawn(dispatcher::run(
            session.clone(),
            bound_rx.clone(),
            response_tx.clone(),
            shutdown.clone(),
        )));
    };
    let spawn_collector = |handles: &mut Vec<JoinHandle<()>>| {
        handles.push(tokio::spawn(collector::run(
            latency_log.clone(),
            inserted.clone(),
            response_rx.clone(),
            shutdown.clone(),
            collector_dwell_signal.clone(),
        )));
    };

    spawn_selector(&mut selector_handles);
    spawn_fabricator(&mut fabricator_handles);
    spawn_dispatcher(&mut dispatcher_handles);
    spawn_collector(&mut collector_handles);

    let start_second = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let watchdog = Watchdog::new(latency_log.clone(), config.termination, shutdown.clone());
    let watchdog_handle = tokio::spawn(watchdog.run(start_second));

    let low_water = TARGET_QUEUE_CAPACITY / 2;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(SUPERVISOR_TICK) => {}
            _ = shutdown.notified() => {}
        }
        if shutdown.is_set() {
            break;
        }

        let selected_len = queue_len(&selected_tx);
        let bound_len = queue_len(&bound_tx);
        let response_len = queue_len(&response_tx);
        let dwell_exceeded = collector_dwell_signal.take();
        info!(
            selected_len,
            bound_len,
            response_len,
            dwell_exceeded,
            selector_workers = selector_handles.len(),
            fabricator_workers = fabricator_handles.len(),
            dispatcher_workers = dispatcher_handles.len(),
            collector_workers = collector_handles.len(),
            "supervisor tick"
        );

        // DataFabricator's input is running dry: more WorkloadSelector workers.
        if selected_len < low_water && selector_handles.len() < MAX_WORKERS_PER_CLASS {
            spawn_selector(&mut selector_handles);
        }
        // QueryDispatcher's input is running dry: more DataFabricator workers.
        if bound_len < low_water && fabricator_handles.len() < MAX_WORKERS_PER_CLASS {
            spawn_fabricator(&mut fabricator_handles);
        }
        // LatencyCollector's input is running dry: more QueryDispatcher workers.
        if response_len < low_water && dispatcher_handles.len() < MAX_WORKERS_PER_CLASS {
            spawn_dispatcher(&mut dispatcher_handles);
        }
        // LatencyCollector overload: either its input queue is full, or its
        // few queued tokens are each dwelling too long (§4.4 step 1) - either
        // signal adds more of itself rather than more upstream producers.
        if (response_len >= TARGET_QUEUE_CAPACITY || dwell_exceeded)
            && collector_handles.len() < MAX_WORKERS_PER_CLASS
        {
            spawn_collector(&mut collector_handles);
        }
    }

    let summary = RunSummary {
        selector_workers: selector_handles.len(),
        fabricator_workers: fabricator_handles.len(),
        dispatcher_workers: dispatcher_handles.len(),
        collector_workers: collector_handles.len(),
    };

    join_all(selector_handles).await;
    join_all(fabricator_handles).await;
    join_all(dispatcher_handles).await;
    join_all(collector_handles).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), watchdog_handle).await;

    summary
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for h in handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), h).await;
    }
}
