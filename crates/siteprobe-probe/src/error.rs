//! Error types for the probing engine.
//!
//! Probe failures are never reported through these; they are recorded
//! in the target's result instead.

use thiserror::Error;

/// Result type alias for runner construction and rendering.
pub type RunnerResult<T> = Result<T, ProbeError>;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("probe interval must be non-zero and schedulable")]
    InvalidInterval,

    #[error("runner already started")]
    AlreadyStarted,

    #[error("failed to render results: {0}")]
    Render(#[from] serde_json::Error),
}
