//! Runner — owns one polling loop per target and the readiness flag.
//!
//! Each loop probes once immediately, then on a fixed-period timer until
//! the shutdown signal fires. A supervisor task counts first-probe
//! completions and flips readiness once every target has reported.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use siteprobe_core::{ProberConfig, TargetResult};

use crate::checker::{Poller, ProbeObserver};
use crate::error::{ProbeError, RunnerResult};
use crate::store::ResultsStore;

/// Cloneable handle to the probing engine.
#[derive(Clone)]
pub struct Runner {
    targets: Arc<[String]>,
    interval: Duration,
    poller: Poller,
    store: ResultsStore,
    ready: Arc<AtomicBool>,
    started: Arc<AtomicBool>,
}

impl Runner {
    /// Build a runner for the configured targets.
    ///
    /// Duplicate target URLs are collapsed so every store key has a
    /// single writer.
    pub fn new(config: &ProberConfig) -> RunnerResult<Self> {
        // The first tick is scheduled at now + interval.
        if config.interval.is_zero() || Instant::now().checked_add(config.interval).is_none() {
            return Err(ProbeError::InvalidInterval);
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(config.targets.len());
        for target in &config.targets {
            if seen.insert(target.as_str()) {
                targets.push(target.clone());
            } else {
                warn!(%target, "duplicate target ignored");
            }
        }

        let store = ResultsStore::new();
        let poller = Poller::new(config.timeout, store.clone())?;

        Ok(Self {
            targets: targets.into(),
            interval: config.interval,
            poller,
            store,
            ready: Arc::new(AtomicBool::new(false)),
            started: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Route every probe's telemetry event to `observer`.
    pub fn with_observer(mut self, observer: ProbeObserver) -> Self {
        self.poller = self.poller.with_observer(observer);
        self
    }

    /// Launch the per-target loops and the readiness supervisor.
    ///
    /// Loops stop once `shutdown` changes (or its sender is dropped).
    /// A runner can only be started once.
    pub fn start(&self, shutdown: watch::Receiver<bool>) -> RunnerResult<RunnerHandle> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ProbeError::AlreadyStarted);
        }

        info!(
            targets = self.targets.len(),
            interval = ?self.interval,
            timeout = ?self.poller.timeout(),
            "probe runner starting"
        );

        let mut loops = JoinSet::new();

        if self.targets.is_empty() {
            self.ready.store(true, Ordering::Release);
            warn!("no targets configured, reporting ready immediately");
            return Ok(RunnerHandle {
                loops,
                supervisor: None,
            });
        }

        let (first_tx, first_rx) = mpsc::channel(self.targets.len());
        for target in self.targets.iter() {
            loops.spawn(run_target_loop(
                target.clone(),
                self.poller.clone(),
                self.interval,
                first_tx.clone(),
                shutdown.clone(),
            ));
        }
        drop(first_tx);

        let supervisor = tokio::spawn(await_first_round(
            self.targets.len(),
            first_rx,
            self.ready.clone(),
        ));

        Ok(RunnerHandle {
            loops,
            supervisor: Some(supervisor),
        })
    }

    /// Whether every target has completed at least one probe.
    pub fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Liveness does not depend on probe outcomes.
    pub fn live(&self) -> bool {
        true
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.poller.timeout()
    }

    pub fn store(&self) -> &ResultsStore {
        &self.store
    }

    /// Point-in-time copy of every target's latest result.
    pub async fn snapshot(&self) -> Vec<TargetResult> {
        self.store.snapshot().await
    }

    /// Snapshot rendered as a pretty-printed JSON array.
    pub async fn snapshot_json(&self) -> RunnerResult<String> {
        let snapshot = self.snapshot().await;
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }
}

/// Handle to the tasks spawned by [`Runner::start`].
pub struct RunnerHandle {
    loops: JoinSet<()>,
    supervisor: Option<JoinHandle<()>>,
}

impl RunnerHandle {
    /// Number of per-target loops still tracked.
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Wait for every loop to stop, aborting whatever is still running
    /// once `grace` elapses. Returns true if all loops stopped in time.
    pub async fn join(mut self, grace: Duration) -> bool {
        let clean = tokio::time::timeout(grace, drain(&mut self.loops))
            .await
            .is_ok();

        if !clean {
            warn!(
                remaining = self.loops.len(),
                grace = ?grace,
                "grace period elapsed, aborting probe loops"
            );
            self.loops.abort_all();
            while self.loops.join_next().await.is_some() {}
        }

        // Every first-round sender is gone by now, so the supervisor
        // finishes on its own.
        if let Some(supervisor) = self.supervisor {
            let _ = supervisor.await;
        }

        debug!(clean, "probe runner stopped");
        clean
    }
}

async fn drain(loops: &mut JoinSet<()>) {
    while let Some(joined) = loops.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                error!(error = %e, "probe loop panicked");
            }
        }
    }
}

/// The polling loop for a single target.
async fn run_target_loop(
    target: String,
    poller: Poller,
    interval: Duration,
    first_done: mpsc::Sender<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(%target, "probe loop starting");

    poller.probe(&target).await;
    // Capacity equals the target count, so this never waits.
    let _ = first_done.send(()).await;
    drop(first_done);

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!(%target, "shutdown sender dropped");
                }
                break;
            }
            _ = ticker.tick() => {
                poller.probe(&target).await;
            }
        }
    }

    debug!(%target, "probe loop stopped");
}

/// Wait for `expected` first-probe reports, then mark the runner ready.
async fn await_first_round(
    expected: usize,
    mut first_done: mpsc::Receiver<()>,
    ready: Arc<AtomicBool>,
) {
    let mut completed = 0;
    while completed < expected {
        match first_done.recv().await {
            Some(()) => completed += 1,
            None => {
                warn!(completed, expected, "probe loops exited before the first round completed");
                return;
            }
        }
    }

    ready.store(true, Ordering::Release);
    info!(targets = expected, "first probe round complete, runner ready");
}
