use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// The outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Sequence number of the sweep, starting at 1.
    pub sweep: u64,
    /// Identifiers the sweep found due for announcement.
    pub candidates: u64,
    /// Identifiers announced and marked fresh.
    pub announced: u64,
    /// Identifiers whose announcement failed after every attempt.
    pub failed: u64,
    /// Identifiers found fresh by the time a worker picked them up.
    pub skipped_fresh: u64,
    /// Fresh ledger entries with no matching stored block.
    pub anomalies: u64,
    /// Time from the start of the sweep until its last work item finished.
    pub elapsed: Duration,
}

/// Per-sweep counters shared between the coordinator and the workers.
#[derive(Debug, Default)]
pub(crate) struct SweepCounters {
    pub(crate) candidates: AtomicU64,
    pub(crate) announced: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) skipped_fresh: AtomicU64,
}

impl SweepCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn summarize(&self, sweep: u64, anomalies: u64, elapsed: Duration) -> SweepSummary {
        SweepSummary {
            sweep,
            candidates: self.candidates.load(Ordering::Relaxed),
            announced: self.announced.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped_fresh: self.skipped_fresh.load(Ordering::Relaxed),
            anomalies,
            elapsed,
        }
    }
}
