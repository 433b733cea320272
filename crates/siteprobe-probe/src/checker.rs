//! Probe logic for a single target.
//!
//! A probe is one HTTP GET bounded by the configured timeout. Its outcome
//! is classified, the failure streak is derived from the previous record,
//! and the new record replaces the old one in the [`ResultsStore`].
//! There are no retries inside a probe; the next tick is the retry.

use std::error::Error as _;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use siteprobe_core::{OutcomeLabel, ProbeEvent, TargetResult};

use crate::error::RunnerResult;
use crate::store::ResultsStore;

/// Error text recorded for a response outside [200, 400).
pub const NON_SUCCESS_STATUS: &str = "non-success status";

/// Callback invoked with the telemetry facts of every completed probe.
pub type ProbeObserver = Arc<dyn Fn(ProbeEvent) -> BoxFuture + Send + Sync>;

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// What the transport produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// A response arrived with this status.
    Response { status: u16 },
    /// The request could not complete (DNS, refused, TLS, timeout, ...).
    Failed { error: String },
}

/// Classified view of a [`TransportOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: u16,
    pub up: bool,
    pub error: String,
    pub label: OutcomeLabel,
}

pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Map a transport outcome to `(status, up, error, label)`.
pub fn classify(outcome: &TransportOutcome) -> Classification {
    match outcome {
        TransportOutcome::Failed { error } => Classification {
            status: 0,
            up: false,
            error: error.clone(),
            label: OutcomeLabel::Error,
        },
        TransportOutcome::Response { status } if is_success_status(*status) => Classification {
            status: *status,
            up: true,
            error: String::new(),
            label: OutcomeLabel::Success,
        },
        TransportOutcome::Response { status } => Classification {
            status: *status,
            up: false,
            error: NON_SUCCESS_STATUS.to_string(),
            label: OutcomeLabel::Status(*status),
        },
    }
}

/// Failure streak for a new outcome given the previous record.
pub fn next_consecutive_failures(previous: Option<&TargetResult>, up: bool) -> u32 {
    if up {
        return 0;
    }
    match previous {
        Some(prev) if !prev.up => prev.consecutive_failures.saturating_add(1),
        _ => 1,
    }
}

/// Build the shared HTTP client. Its own request timeout matches the
/// probe timeout in case the outer deadline is not honoured.
pub fn build_client(timeout: Duration) -> RunnerResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("siteprobe/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Executes probes and commits their results.
#[derive(Clone)]
pub struct Poller {
    client: reqwest::Client,
    timeout: Duration,
    store: ResultsStore,
    observer: Option<ProbeObserver>,
}

impl Poller {
    pub fn new(timeout: Duration, store: ResultsStore) -> RunnerResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            timeout,
            store,
            observer: None,
        })
    }

    /// Set the callback that receives each probe's telemetry event.
    pub fn with_observer(mut self, observer: ProbeObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn store(&self) -> &ResultsStore {
        &self.store
    }

    /// Probe `target` once and commit exactly one result for it.
    pub async fn probe(&self, target: &str) -> TargetResult {
        let started = Instant::now();
        let outcome = self.fetch(target).await;
        let latency = started.elapsed();

        let class = classify(&outcome);
        let last_checked = Utc::now();

        let mut previous_up = None;
        let result = self
            .store
            .update(target, |prev| {
                previous_up = prev.map(|p| p.up);
                TargetResult {
                    target: target.to_string(),
                    status: class.status,
                    latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    last_checked,
                    up: class.up,
                    error: class.error.clone(),
                    consecutive_failures: next_consecutive_failures(prev, class.up),
                }
            })
            .await;

        match (previous_up, result.up) {
            (Some(true) | None, false) => warn!(
                %target,
                status = result.status,
                error = %result.error,
                "target down"
            ),
            (Some(false), true) => info!(%target, status = result.status, "target recovered"),
            _ => debug!(
                %target,
                status = result.status,
                latency_ms = result.latency_ms,
                up = result.up,
                consecutive_failures = result.consecutive_failures,
                "probe complete"
            ),
        }

        if let Some(ref observer) = self.observer {
            observer(ProbeEvent {
                target: target.to_string(),
                outcome: class.label,
                latency,
                up: result.up,
                consecutive_failures: result.consecutive_failures,
            })
            .await;
        }

        result
    }

    /// Single GET under the probe deadline.
    async fn fetch(&self, target: &str) -> TransportOutcome {
        let request = self.client.get(target).send();

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                // Dropping the response releases the connection and any
                // unread body.
                drop(response);
                TransportOutcome::Response { status }
            }
            Ok(Err(e)) => {
                debug!(%target, error = %e, "probe request failed");
                TransportOutcome::Failed {
                    error: describe_error(&e),
                }
            }
            Err(_) => {
                debug!(%target, timeout = ?self.timeout, "probe timed out");
                TransportOutcome::Failed {
                    error: format!("request timed out after {:?}", self.timeout),
                }
            }
        }
    }
}

/// Flatten an error and its source chain into one line.
fn describe_error(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
