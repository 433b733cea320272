//! Prober configuration and the string parsers that feed it.
//!
//! Durations use the `<number><unit>` notation (`15s`, `500ms`, `1m30s`,
//! `1.5h`). Target lists are comma-separated URLs.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Already-parsed inputs to the probing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProberConfig {
    /// Endpoints to probe, in configuration order. May be empty.
    pub targets: Vec<String>,
    /// Period between probes of the same target.
    pub interval: Duration,
    /// Upper bound for a single probe.
    pub timeout: Duration,
    /// Port the query surface listens on.
    pub port: u16,
    /// How long shutdown waits for in-flight probes.
    pub shutdown_grace: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            port: DEFAULT_PORT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl ProberConfig {
    /// Config with the given targets and default timings.
    pub fn with_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Split a comma-separated target list, trimming items and dropping
/// empty ones.
pub fn parse_targets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

const MAX_DURATION_NANOS: u128 = i64::MAX as u128;

/// Parse a duration string such as `"15s"`, `"250ms"` or `"1m30s"`.
pub fn parse_duration(raw: &str) -> ConfigResult<Duration> {
    let input = raw.trim();
    let invalid = || ConfigError::InvalidDuration(raw.to_string());

    if input.is_empty() {
        return Err(invalid());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = input;
    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        // Number: digits with an optional fractional part.
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..num_len];
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(invalid());
        }
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        if unit.is_empty() {
            return Err(ConfigError::MissingUnit(raw.to_string()));
        }
        rest = &rest[unit_len..];

        let scale = unit_nanos(unit).ok_or_else(|| ConfigError::UnknownUnit {
            unit: unit.to_string(),
            input: raw.to_string(),
        })?;

        let (whole, frac) = match number.split_once('.') {
            Some((w, f)) => (w, f),
            None => (number, ""),
        };
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(invalid)?;
        if !frac.is_empty() {
            let frac_value: f64 = format!("0.{frac}").parse().map_err(|_| invalid())?;
            nanos += (frac_value * scale as f64).round() as u128;
        }
        total_nanos = total_nanos.checked_add(nanos).ok_or_else(invalid)?;
    }

    // Same ceiling as Go's time.Duration (i64 nanoseconds).
    if total_nanos > MAX_DURATION_NANOS {
        return Err(invalid());
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000).map_err(|_| invalid())?;
    let sub = (total_nanos % 1_000_000_000) as u32;
    Ok(Duration::new(secs, sub))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

/// Resolve an optional duration setting, falling back to `default` when
/// it is absent, empty, or malformed.
pub fn duration_or_default(key: &str, raw: Option<&str>, default: Duration) -> Duration {
    match raw.map(str::trim) {
        None | Some("") => default,
        Some(value) => match parse_duration(value) {
            Ok(d) => d,
            Err(e) => {
                warn!(%key, %value, error = %e, default = ?default, "invalid duration, using default");
                default
            }
        },
    }
}
