//! Domain types shared between the prober, the query surface, and the
//! telemetry exporter.
//!
//! `TargetResult` is what gets stored and rendered as JSON. `ProbeEvent`
//! is what each probe hands to telemetry consumers.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Result record ──────────────────────────────────────────────────

/// Latest recorded outcome for one target.
///
/// Only the most recent probe is kept; there is no history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetResult {
    pub target: String,
    /// Last observed HTTP status, 0 when the request did not complete.
    pub status: u16,
    /// Wall-clock duration of the last probe attempt.
    pub latency_ms: u64,
    pub last_checked: DateTime<Utc>,
    pub up: bool,
    /// Failure cause; empty when `up` is true.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Length of the current run of non-up outcomes ending at this one.
    pub consecutive_failures: u32,
}

impl TargetResult {
    /// True when the record satisfies `consecutive_failures > 0 <=> !up`.
    pub fn is_consistent(&self) -> bool {
        (self.consecutive_failures > 0) == !self.up
    }
}

// ── Probe events ───────────────────────────────────────────────────

/// Coarse outcome label attached to the probe duration distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutcomeLabel {
    /// Status in [200, 400).
    Success,
    /// A response arrived but its status was outside [200, 400).
    Status(u16),
    /// The request could not complete.
    Error,
}

impl OutcomeLabel {
    /// Label value as exported (`"success"`, `"503"`, `"error"`).
    pub fn as_label(&self) -> String {
        match self {
            OutcomeLabel::Success => "success".to_string(),
            OutcomeLabel::Status(code) => code.to_string(),
            OutcomeLabel::Error => "error".to_string(),
        }
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_label())
    }
}

/// Telemetry facts reported once per completed probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeEvent {
    pub target: String,
    pub outcome: OutcomeLabel,
    pub latency: Duration,
    /// Drives the up/down gauge (1/0).
    pub up: bool,
    /// Drives the failure-streak gauge.
    pub consecutive_failures: u32,
}

impl ProbeEvent {
    pub fn latency_seconds(&self) -> f64 {
        self.latency.as_secs_f64()
    }

    /// Gauge value for the up/down fact.
    pub fn up_value(&self) -> u8 {
        u8::from(self.up)
    }
}
