//! siteprobed — the siteprobe daemon.
//!
//! Single binary that assembles the prober:
//! - Probe runner (one loop per target)
//! - Metrics collector fed by the runner
//! - HTTP query surface (health, readiness, results, metrics)
//!
//! # Usage
//!
//! ```text
//! TARGETS=https://example.com,https://example.org siteprobed --port 8080 --interval 15s
//! ```

mod cli;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use siteprobe_core::ProberConfig;
use siteprobe_metrics::ProbeMetrics;
use siteprobe_probe::Runner;

use crate::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "info,siteprobed=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    run(cli.to_config()).await
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config: ProberConfig) -> anyhow::Result<()> {
    info!(
        port = config.port,
        interval = ?config.interval,
        timeout = ?config.timeout,
        targets = ?config.targets,
        "siteprobed starting"
    );

    if config.targets.is_empty() {
        warn!("no targets provided");
    }

    // ── Initialize subsystems ──────────────────────────────────

    let metrics = Arc::new(ProbeMetrics::new());
    let runner = Runner::new(&config)
        .context("failed to build probe runner")?
        .with_observer(metrics.observer());

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start probing ──────────────────────────────────────────

    let probes = runner.start(shutdown_rx)?;
    info!(
        loops = probes.len(),
        interval = ?runner.interval(),
        timeout = ?runner.timeout(),
        "probe loops started"
    );

    // ── Start API server ───────────────────────────────────────

    let router = siteprobe_api::build_router(runner, metrics);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "query surface listening");

    let stopping = shutdown_tx.subscribe();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            })
            .await
    });

    if !serve_until_drained(server, stopping, config.shutdown_grace).await? {
        warn!(grace = ?config.shutdown_grace, "http server did not drain within grace period");
    }

    // Give in-flight probes a bounded window to commit.
    if !probes.join(config.shutdown_grace).await {
        warn!(grace = ?config.shutdown_grace, "probe loops did not stop within grace period");
    }

    info!("siteprobed stopped");
    Ok(())
}

/// Wait for the server task to finish. Once shutdown starts, the drain
/// gets `grace` before the task is aborted. Returns false if it was.
async fn serve_until_drained(
    mut server: JoinHandle<std::io::Result<()>>,
    mut stopping: watch::Receiver<bool>,
    grace: Duration,
) -> anyhow::Result<bool> {
    tokio::select! {
        joined = &mut server => {
            joined.context("http server task failed")?.context("http server failed")?;
            return Ok(true);
        }
        _ = stopping.changed() => {}
    }

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            joined.context("http server task failed")?.context("http server failed")?;
            Ok(true)
        }
        Err(_) => {
            server.abort();
            Ok(false)
        }
    }
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C only on non-unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
