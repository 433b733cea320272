//! siteprobe-metrics — telemetry export for probe outcomes.
//!
//! Consumes one [`ProbeEvent`](siteprobe_core::ProbeEvent) per probe and
//! keeps the series scraped from `/metrics`.
//!
//! # Architecture
//!
//! ```text
//! ProbeMetrics
//!   ├── observer() → ProbeObserver handed to the Runner
//!   ├── record()   ← one call per probe
//!   └── families() → sorted series for rendering
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod collector;
pub mod prometheus;

pub use collector::{DEFAULT_BUCKETS, Histogram, MetricFamilies, ProbeMetrics};
pub use prometheus::render_prometheus;
