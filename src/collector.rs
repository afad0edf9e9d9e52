use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::envelope::extract_records;
use crate::fetcher::{hero_rate_endpoint, JsonSource};
use crate::latency::LatencyStats;
use crate::types::{HeroRateSnapshot, LatestRates};

#[derive(Debug, Default)]
pub struct CollectStats {
    pub requested: usize,
    pub collected: usize,
    /// Envelope present but the record list was empty.
    pub empty: usize,
    /// Response did not have the `data.records` shape.
    pub unexpected_shape: usize,
    /// Transport or HTTP status failures.
    pub failed: usize,
    pub latency: LatencyStats,
}

/// Fetch the rate series of each hero in `hero_ids`, one request at a time,
/// keeping only the last record of each series. Heroes without data are
/// skipped; the caller gets whatever could be collected.
pub async fn collect_hero_rates<S: JsonSource>(
    source: &S,
    hero_ids: &[u32],
    delay: Duration,
) -> (Vec<HeroRateSnapshot>, CollectStats) {
    let mut snapshots = Vec::with_capacity(hero_ids.len());
    let mut stats = CollectStats {
        requested: hero_ids.len(),
        ..CollectStats::default()
    };

    info!("Collecting rates for {} heroes", hero_ids.len());

    for (i, &hero_id) in hero_ids.iter().enumerate() {
        let started = Instant::now();
        let response = source.get_json(&hero_rate_endpoint(hero_id)).await;
        stats.latency.record(started.elapsed());

        match response {
            Ok(raw) => match extract_records(&raw) {
                Some(records) => match records.last() {
                    Some(latest) => {
                        snapshots.push(snapshot_from_record(hero_id, latest));
                        stats.collected += 1;
                    }
                    None => stats.empty += 1,
                },
                None => {
                    warn!(hero_id, "hero-rate response has an unexpected shape");
                    stats.unexpected_shape += 1;
                }
            },
            Err(_) => stats.failed += 1,
        }

        debug!("Rates progress {}/{}", i + 1, hero_ids.len());

        if !delay.is_zero() && i + 1 < hero_ids.len() {
            tokio::time::sleep(delay).await;
        }
    }

    let (p50, p95, max) = stats.latency.summary();
    info!(
        requested = stats.requested,
        collected = stats.collected,
        empty = stats.empty,
        unexpected_shape = stats.unexpected_shape,
        failed = stats.failed,
        "Rate collection done | latency p50={}ms p95={}ms max={}ms",
        p50.unwrap_or(0),
        p95.unwrap_or(0),
        max.unwrap_or(0),
    );

    (snapshots, stats)
}

/// The record's `data` object becomes the stored payload; rates come from the
/// last element of its `win_rate` series.
fn snapshot_from_record(hero_id: u32, record: &serde_json::Value) -> HeroRateSnapshot {
    let payload = record.get("data").cloned().unwrap_or(serde_json::Value::Null);
    let rates = LatestRates::from_payload(&payload).unwrap_or_default();
    HeroRateSnapshot {
        hero_id,
        rates,
        payload,
    }
}

/// Hero ids for the legacy fixed-range mode: 1..=end.
pub fn fixed_hero_range(end: u32) -> Vec<u32> {
    (1..=end).collect()
}
