use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::collector::{collect_hero_rates, fixed_hero_range};
use crate::config::Config;
use crate::envelope::extract_records;
use crate::error::{AppError, Result};
use crate::fetcher::{positions_endpoint, JsonSource};
use crate::store::{AppendOutcome, HistoricalRecord, HistoricalStore};
use crate::types::{join_titles, HeroPosition, HeroRateSnapshot, Tag, LANE_TITLE_KEY, ROLE_TITLE_KEY};

/// Flatten one positions record. The hero lives under `data`:
/// `{"data": {"hero_id": 1, "hero": {"data": {"name", "sortid": [...], "roadsort": [...]}}}}`.
pub fn parse_position(record: &Value) -> Option<HeroPosition> {
    let data = record.get("data")?;
    let hero_id = data
        .get("hero_id")
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .and_then(|v| u32::try_from(v).ok())?;

    let hero = data.get("hero").and_then(|h| h.get("data"));
    let name = hero
        .and_then(|h| h.get("name"))
        .and_then(|n| n.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let raw_roles = hero.and_then(|h| h.get("sortid")).cloned().unwrap_or(Value::Null);
    let raw_lanes = hero.and_then(|h| h.get("roadsort")).cloned().unwrap_or(Value::Null);

    Some(HeroPosition {
        hero_id,
        name,
        roles: Tag::parse_list(&raw_roles, ROLE_TITLE_KEY),
        lanes: Tag::parse_list(&raw_lanes, LANE_TITLE_KEY),
        raw_roles,
        raw_lanes,
    })
}

/// Hero ids in first-seen order, without repeats.
pub fn discover_roster(positions: &[HeroPosition]) -> Vec<u32> {
    let mut seen = HashSet::new();
    positions
        .iter()
        .map(|p| p.hero_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Inner join of positions and rates on hero id, keeping the first row per
/// hero. Heroes missing on either side are dropped. Nested values are
/// serialized to compact JSON text and every row gets `extraction_date`.
pub fn merge(
    positions: &[HeroPosition],
    rates: &[HeroRateSnapshot],
    extraction_date: NaiveDate,
) -> Result<Vec<HistoricalRecord>> {
    let mut rates_by_id: HashMap<u32, &HeroRateSnapshot> = HashMap::with_capacity(rates.len());
    for snap in rates {
        rates_by_id.entry(snap.hero_id).or_insert(snap);
    }

    let mut emitted = HashSet::new();
    let mut merged = Vec::with_capacity(positions.len());

    for pos in positions {
        let Some(snap) = rates_by_id.get(&pos.hero_id) else {
            continue;
        };
        if !emitted.insert(pos.hero_id) {
            continue;
        }
        merged.push(HistoricalRecord {
            hero_id: pos.hero_id,
            hero_name: pos.name.clone(),
            roles: join_titles(&pos.roles),
            lanes: join_titles(&pos.lanes),
            raw_roles: serde_json::to_string(&pos.raw_roles)?,
            raw_lanes: serde_json::to_string(&pos.raw_lanes)?,
            win_rate: snap.rates.win_rate,
            ban_rate: snap.rates.ban_rate,
            app_rate: snap.rates.app_rate,
            data: serde_json::to_string(&snap.payload)?,
            extraction_date,
        });
    }

    Ok(merged)
}

/// Fetch, flatten, collect and merge one snapshot of the roster.
/// Fails when the positions list or the collected rates come back empty.
pub async fn extract<S: JsonSource>(
    source: &S,
    cfg: &Config,
    extraction_date: NaiveDate,
) -> Result<Vec<HistoricalRecord>> {
    info!("Fetching hero positions");
    let raw = source
        .get_json(&positions_endpoint(cfg.positions_page_size))
        .await
        .map_err(|e| AppError::Extraction(format!("hero positions request failed: {e}")))?;

    let records = extract_records(&raw).ok_or_else(|| {
        AppError::Extraction("hero positions response has an unexpected shape".to_string())
    })?;
    if records.is_empty() {
        return Err(AppError::Extraction("hero positions list is empty".to_string()));
    }

    let positions: Vec<HeroPosition> = records.iter().filter_map(parse_position).collect();
    let unparsed = records.len() - positions.len();
    if unparsed > 0 {
        warn!("{unparsed} position records could not be flattened");
    }
    if positions.is_empty() {
        return Err(AppError::Extraction("no usable hero positions".to_string()));
    }
    info!("Hero positions: {} heroes", positions.len());

    let hero_ids = match cfg.hero_id_range_end {
        Some(end) => fixed_hero_range(end),
        None => discover_roster(&positions),
    };

    let (rates, _stats) = collect_hero_rates(source, &hero_ids, cfg.request_delay).await;
    if rates.is_empty() {
        return Err(AppError::Extraction(
            "no rate data returned for any hero".to_string(),
        ));
    }

    let merged = merge(&positions, &rates, extraction_date)?;
    if merged.is_empty() {
        return Err(AppError::Extraction(
            "positions and rates share no hero ids".to_string(),
        ));
    }
    info!("Merged {} unique heroes", merged.len());
    Ok(merged)
}

/// Full extraction run: nothing is written unless the extraction succeeds.
pub async fn run_extraction<S: JsonSource>(
    source: &S,
    cfg: &Config,
    store: &HistoricalStore,
    extraction_date: NaiveDate,
) -> Result<(Vec<HistoricalRecord>, AppendOutcome)> {
    let merged = extract(source, cfg, extraction_date).await?;
    let outcome = store.append(&merged)?;
    store.write_latest(&merged)?;
    Ok((merged, outcome))
}
