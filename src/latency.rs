//! Latency histogram for upstream requests made by the rate collector.

use std::time::Duration;

use hdrhistogram::Histogram;

/// Highest trackable latency in milliseconds (10 minutes).
const MAX_TRACKED_MS: u64 = 600_000;

/// Values stored in milliseconds.
#[derive(Clone)]
pub struct LatencyStats {
    histogram: Histogram<u64>,
}

impl LatencyStats {
    /// Tracks 1ms to 10min, 3 significant figures.
    pub fn new() -> Self {
        let histogram =
            Histogram::new_with_bounds(1, MAX_TRACKED_MS, 3).expect("valid histogram bounds");
        Self { histogram }
    }

    /// Sub-millisecond samples count as 1ms; anything past 10min is
    /// recorded at the top bucket.
    pub fn record(&mut self, d: Duration) {
        let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1);
        self.histogram.saturating_record(ms);
    }

    /// Return (p50_ms, p95_ms, max_ms). None if no samples.
    pub fn summary(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        if self.histogram.len() == 0 {
            return (None, None, None);
        }
        (
            Some(self.histogram.value_at_quantile(0.5)),
            Some(self.histogram.value_at_quantile(0.95)),
            Some(self.histogram.max()),
        )
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LatencyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (p50, p95, max) = self.summary();
        f.debug_struct("LatencyStats")
            .field("samples", &self.len())
            .field("p50_ms", &p50)
            .field("p95_ms", &p95)
            .field("max_ms", &max)
            .finish()
    }
}
