//! Results store — latest result per target, shared between pollers and
//! readers.
//!
//! Entries are only ever replaced wholesale. The lock is held for a
//! single map write or copy, never across a network call.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use siteprobe_core::TargetResult;

/// Cloneable handle to the shared target → result map.
#[derive(Clone, Default)]
pub struct ResultsStore {
    results: Arc<RwLock<HashMap<String, TargetResult>>>,
}

impl ResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `result.target`.
    pub async fn commit(&self, result: TargetResult) {
        let mut results = self.results.write().await;
        results.insert(result.target.clone(), result);
    }

    /// Build the next result for `target` from the previous one (if any)
    /// and store it, both in one exclusive section.
    ///
    /// Returns a copy of the committed record.
    pub async fn update<F>(&self, target: &str, next: F) -> TargetResult
    where
        F: FnOnce(Option<&TargetResult>) -> TargetResult,
    {
        let mut results = self.results.write().await;
        let result = next(results.get(target));
        debug_assert_eq!(result.target, target);
        results.insert(target.to_string(), result.clone());
        result
    }

    /// Latest result for one target.
    pub async fn get(&self, target: &str) -> Option<TargetResult> {
        let results = self.results.read().await;
        results.get(target).cloned()
    }

    /// Point-in-time copy of every stored result. Order is unspecified.
    pub async fn snapshot(&self) -> Vec<TargetResult> {
        let results = self.results.read().await;
        results.values().cloned().collect()
    }

    /// Number of targets with at least one completed probe.
    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }
}
