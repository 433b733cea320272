//! Metrics collector — per-target probe series.
//!
//! Keeps a latency histogram per `(target, code)` pair and the latest
//! up/down and failure-streak gauges per target.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use siteprobe_core::ProbeEvent;
use siteprobe_probe::{BoxFuture, ProbeObserver};

use crate::prometheus::render_prometheus;

/// Upper bounds (seconds) of the probe duration histogram buckets.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Fixed-bucket latency histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Per-bucket (non-cumulative) counts, aligned with [`DEFAULT_BUCKETS`].
    buckets: [u64; DEFAULT_BUCKETS.len()],
    sum: f64,
    count: u64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            buckets: [0; DEFAULT_BUCKETS.len()],
            sum: 0.0,
            count: 0,
        }
    }
}

impl Histogram {
    pub fn observe(&mut self, seconds: f64) {
        if let Some(idx) = DEFAULT_BUCKETS.iter().position(|le| seconds <= *le) {
            self.buckets[idx] += 1;
        }
        self.sum += seconds;
        self.count += 1;
    }

    /// `(upper bound, cumulative count)` pairs, excluding `+Inf`.
    pub fn cumulative(&self) -> Vec<(f64, u64)> {
        let mut running = 0;
        DEFAULT_BUCKETS
            .iter()
            .zip(self.buckets.iter())
            .map(|(le, n)| {
                running += n;
                (*le, running)
            })
            .collect()
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Total observations; also the `+Inf` bucket.
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TargetGauges {
    up: u8,
    consecutive_failures: u32,
}

#[derive(Default)]
struct Series {
    /// (target, code) → histogram.
    durations: BTreeMap<(String, String), Histogram>,
    gauges: BTreeMap<String, TargetGauges>,
}

/// Sorted copy of every series, ready for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFamilies {
    pub durations: Vec<(String, String, Histogram)>,
    pub up: Vec<(String, u8)>,
    pub consecutive_failures: Vec<(String, u32)>,
}

/// Collects probe telemetry across all targets.
#[derive(Default)]
pub struct ProbeMetrics {
    series: RwLock<Series>,
}

impl ProbeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the facts of one probe.
    pub async fn record(&self, event: &ProbeEvent) {
        let code = event.outcome.as_label();
        let mut series = self.series.write().await;

        series
            .durations
            .entry((event.target.clone(), code))
            .or_default()
            .observe(event.latency_seconds());

        let gauges = series.gauges.entry(event.target.clone()).or_default();
        gauges.up = event.up_value();
        gauges.consecutive_failures = event.consecutive_failures;
    }

    /// Observer callback that feeds this collector.
    pub fn observer(self: &Arc<Self>) -> ProbeObserver {
        let metrics = Arc::clone(self);
        Arc::new(move |event: ProbeEvent| -> BoxFuture {
            let metrics = Arc::clone(&metrics);
            Box::pin(async move {
                metrics.record(&event).await;
            })
        })
    }

    /// Copy every series out, sorted by labels.
    pub async fn families(&self) -> MetricFamilies {
        let series = self.series.read().await;
        MetricFamilies {
            durations: series
                .durations
                .iter()
                .map(|((target, code), h)| (target.clone(), code.clone(), h.clone()))
                .collect(),
            up: series
                .gauges
                .iter()
                .map(|(target, g)| (target.clone(), g.up))
                .collect(),
            consecutive_failures: series
                .gauges
                .iter()
                .map(|(target, g)| (target.clone(), g.consecutive_failures))
                .collect(),
        }
    }

    /// Render all series in Prometheus text format.
    pub async fn render(&self) -> String {
        let families = self.families().await;
        debug!(
            targets = families.up.len(),
            histograms = families.durations.len(),
            "rendering probe metrics"
        );
        render_prometheus(&families)
    }
}
