//! Per-tick outcomes, counters, and bounded run history.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickOutcome {
    /// A new record was stored.
    Appended { id: i64 },
    /// The fetched candidate repeated the latest record.
    Unchanged,
    /// The remote read failed; no store operation was attempted.
    FetchFailed { reason: String },
    /// The store could not be read or written.
    StorageUnavailable { reason: String },
    /// The tick body panicked. The scheduler keeps running.
    Aborted { reason: String },
}

impl TickOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed { .. } | Self::StorageUnavailable { .. } | Self::Aborted { .. }
        )
    }
}

/// One entry in the scheduler's run history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based tick sequence number.
    pub seq: u64,
    /// RFC 3339 start time.
    pub started_at: String,
    pub duration_ms: u64,
    pub outcome: TickOutcome,
}

/// Point-in-time copy of [`TickStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStatsSnapshot {
    pub ticks: u64,
    pub appended: u64,
    pub unchanged: u64,
    pub fetch_failures: u64,
    pub storage_failures: u64,
    pub aborted: u64,
}

/// Lock-free tick counters shared between the worker and observers.
#[derive(Debug, Default)]
pub struct TickStats {
    ticks: AtomicU64,
    appended: AtomicU64,
    unchanged: AtomicU64,
    fetch_failures: AtomicU64,
    storage_failures: AtomicU64,
    aborted: AtomicU64,
}

impl TickStats {
    /// Count `outcome` and return the tick's sequence number.
    pub fn record(&self, outcome: &TickOutcome) -> u64 {
        let counter = match outcome {
            TickOutcome::Appended { .. } => &self.appended,
            TickOutcome::Unchanged => &self.unchanged,
            TickOutcome::FetchFailed { .. } => &self.fetch_failures,
            TickOutcome::StorageUnavailable { .. } => &self.storage_failures,
            TickOutcome::Aborted { .. } => &self.aborted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> TickStatsSnapshot {
        TickStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            appended: self.appended.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }
}

/// Ring buffer of the most recent [`TickReport`]s.
#[derive(Debug)]
pub struct TickHistory {
    limit: usize,
    entries: Mutex<VecDeque<TickReport>>,
}

impl TickHistory {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            entries: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    pub fn push(&self, report: TickReport) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.len() == self.limit {
            entries.pop_front();
        }
        entries.push_back(report);
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<TickReport> {
        self.entries
            .lock()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }
}
