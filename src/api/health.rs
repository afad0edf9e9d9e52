//! Shared counters for the /health endpoint.
//! Updated by the data route handlers on every table load; /health reads
//! the table without counting.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Successful loads of the historical table.
    pub loads_ok: AtomicU64,
    /// Loads that failed (missing or unreadable file).
    pub loads_failed: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&self, ok: bool) {
        let counter = if ok { &self.loads_ok } else { &self.loads_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn loads_ok(&self) -> u64 {
        self.loads_ok.load(Ordering::Relaxed)
    }

    pub fn loads_failed(&self) -> u64 {
        self.loads_failed.load(Ordering::Relaxed)
    }
}
