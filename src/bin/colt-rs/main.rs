//! Process bootstrap (§4.10, §6 "Process contract").
//!
//! Grounded on the teacher's `cql-stress-cassandra-stress/main.rs`:
//! `tracing_subscriber` init with an `EnvFilter` and a `ctrl_c` handler
//! spawned alongside the pipeline future. This binary's "concurrency" is
//! fixed by the five-stage pipeline rather than a single worker count, so
//! there is no separate status ticker here - the pipeline prints its own
//! per-second summary via the Watchdog, and a single Ctrl+C is enough to
//! request shutdown since every worker already honors it within one
//! supervisor tick.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use colt_rs::config;
use colt_rs::db::scylla_session::ScyllaDbSession;
use colt_rs::db::DbSession;
use colt_rs::model::DatabaseKind;
use colt_rs::pipeline::{supervisor, Shutdown};
use colt_rs::schema;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config_path = match env::args().nth(1) {
        Some(p) if env::args().len() == 2 => p,
        _ => {
            eprintln!("usage: colt-rs <config.yaml>");
            return ExitCode::FAILURE;
        }
    };

    match run(config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

/// Single positional argument: the config path (§6). Any failure before the
/// pipeline starts (missing/invalid config, schema preparation) is fatal;
/// exit 0 is reserved for a clean shutdown of a pipeline that actually ran.
async fn run(config_path: String) -> Result<()> {
    let validated = config::load(&config_path).with_context(|| {
        format!("failed to load configuration from {config_path}")
    })?;

    let session: Arc<dyn DbSession> = match validated.database.kind {
        DatabaseKind::Cassandra => Arc::new(
            ScyllaDbSession::connect(&validated.database.connection_arguments)
                .await
                .context("failed to connect to the cluster")?,
        ),
    };

    info!(config_path = %config_path, "preparing schema");
    let loadgen_config = schema::prepare(session.as_ref(), validated)
        .await
        .context("failed to prepare schema and queries")?;
    let loadgen_config = Arc::new(loadgen_config);

    let shutdown = Arc::new(Shutdown::new());
    tokio::spawn(stop_on_signal(shutdown.clone()));

    info!(
        workloads = loadgen_config.workloads.len(),
        "starting pipeline"
    );
    let summary = supervisor::run(loadgen_config, session, shutdown).await;
    info!(
        selector_workers = summary.selector_workers,
        fabricator_workers = summary.fabricator_workers,
        dispatcher_workers = summary.dispatcher_workers,
        collector_workers = summary.collector_workers,
        "pipeline finished"
    );

    Ok(())
}

/// Two-stage signal handling, matching the teacher's `stop_on_signal`: the
/// first Ctrl+C asks the pipeline to shut down cleanly; a second one during
/// the same process lifetime would otherwise have nothing left to escalate
/// to, since every worker already honors `shutdown` within one supervisor
/// tick.
async fn stop_on_signal(shutdown: Arc<Shutdown>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        shutdown.trigger();
    }
}
