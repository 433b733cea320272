//! Command-line and environment configuration.

use clap::Parser;

use siteprobe_core::config::{DEFAULT_INTERVAL, DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE, DEFAULT_TIMEOUT};
use siteprobe_core::{ProberConfig, duration_or_default, parse_targets};

#[derive(Debug, Parser)]
#[command(name = "siteprobed", about = "Periodic HTTP endpoint prober", version)]
pub struct Cli {
    /// Port the query surface listens on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Comma-separated list of URLs to probe.
    #[arg(long, env = "TARGETS", default_value = "")]
    pub targets: String,

    /// Time between probes of the same target (e.g. "15s", "1m").
    #[arg(long, env = "INTERVAL")]
    pub interval: Option<String>,

    /// Upper bound for a single probe (e.g. "5s", "500ms").
    #[arg(long, env = "TIMEOUT")]
    pub timeout: Option<String>,

    /// How long shutdown waits for in-flight probes.
    #[arg(long, env = "SHUTDOWN_GRACE")]
    pub shutdown_grace: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Resolve into a prober config. Malformed durations fall back to
    /// their defaults (logged), so call this after tracing is set up.
    pub fn to_config(&self) -> ProberConfig {
        ProberConfig {
            targets: parse_targets(&self.targets),
            interval: duration_or_default("INTERVAL", self.interval.as_deref(), DEFAULT_INTERVAL),
            timeout: duration_or_default("TIMEOUT", self.timeout.as_deref(), DEFAULT_TIMEOUT),
            port: self.port,
            shutdown_grace: duration_or_default(
                "SHUTDOWN_GRACE",
                self.shutdown_grace.as_deref(),
                DEFAULT_SHUTDOWN_GRACE,
            ),
        }
    }
}
