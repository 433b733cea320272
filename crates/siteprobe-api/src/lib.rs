//! siteprobe-api — HTTP query surface for the prober.
//!
//! Read-only: every handler calls into the runner's or the metrics
//! collector's accessors and never touches probe scheduling.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness, always `ok` |
//! | GET | `/readyz` | `ok` once every target was probed, else 503 |
//! | GET | `/results` | Latest result per target (JSON array) |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use siteprobe_metrics::ProbeMetrics;
use siteprobe_probe::Runner;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub runner: Runner,
    pub metrics: Arc<ProbeMetrics>,
}

/// Build the complete router.
pub fn build_router(runner: Runner, metrics: Arc<ProbeMetrics>) -> Router {
    let state = ApiState { runner, metrics };

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/results", get(handlers::results))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
