//! siteprobe-core — shared types for the siteprobe workspace.
//!
//! Holds the per-target result record, the probe event handed to
//! telemetry consumers, and the prober configuration with its parsing
//! helpers. Nothing in here performs I/O.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ProberConfig, duration_or_default, parse_duration, parse_targets};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
