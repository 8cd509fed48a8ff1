use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while scanning one dump
#[derive(Default, Debug)]
pub struct ScanStats {
    pub titles_seen: AtomicU64,
    pub titles_rejected: AtomicU64,
    pub ids_skipped: AtomicU64,
    pub facts_emitted: AtomicU64,
}

/// Plain copy of [`ScanStats`] for reporting once a scan is over.
#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ScanSummary {
    pub titles_seen: u64,
    pub titles_rejected: u64,
    pub ids_skipped: u64,
    pub facts_emitted: u64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_titles(&self) {
        self.titles_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.titles_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped_ids(&self) {
        self.ids_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_facts(&self) {
        self.facts_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn titles(&self) -> u64 {
        self.titles_seen.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.titles_rejected.load(Ordering::Relaxed)
    }

    pub fn skipped_ids(&self) -> u64 {
        self.ids_skipped.load(Ordering::Relaxed)
    }

    pub fn facts(&self) -> u64 {
        self.facts_emitted.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ScanSummary {
        ScanSummary {
            titles_seen: self.titles(),
            titles_rejected: self.rejected(),
            ids_skipped: self.skipped_ids(),
            facts_emitted: self.facts(),
        }
    }
}

impl ScanSummary {
    /// Field-wise sum, for totals across several dumps.
    pub fn combine(self, other: ScanSummary) -> ScanSummary {
        ScanSummary {
            titles_seen: self.titles_seen + other.titles_seen,
            titles_rejected: self.titles_rejected + other.titles_rejected,
            ids_skipped: self.ids_skipped + other.ids_skipped,
            facts_emitted: self.facts_emitted + other.facts_emitted,
        }
    }
}
