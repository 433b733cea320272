//! siteprobe-probe — the probing engine.
//!
//! Runs one polling loop per configured target, keeps the latest result
//! of each in a shared store, and derives the readiness signal from the
//! first full probe round.
//!
//! # Architecture
//!
//! ```text
//! Runner
//!   ├── Per-target loop (probe now, then every interval)
//!   │   ├── Poller::probe() → GET with timeout → classify
//!   │   ├── failure streak from previous record
//!   │   ├── commit into ResultsStore
//!   │   └── ProbeObserver callback (telemetry)
//!   └── Supervisor: first round complete → ready = true (once)
//! ```
//!
//! Shutdown is a `watch` signal observed at each loop's timer wait. A
//! probe already in flight finishes or hits its own timeout.

pub mod checker;
pub mod error;
pub mod runner;
pub mod store;

#[cfg(test)]
mod testutil;

pub use checker::{
    BoxFuture, Classification, NON_SUCCESS_STATUS, Poller, ProbeObserver, TransportOutcome,
    classify, next_consecutive_failures,
};
pub use error::{ProbeError, RunnerResult};
pub use runner::{Runner, RunnerHandle};
pub use store::ResultsStore;
