use chrono::NaiveDate;
use serde::Serialize;

use crate::config::UNKNOWN_LABEL;
use crate::store::HistoricalRecord;
use crate::types::{LatestRates, Tag, LANE_TITLE_KEY, ROLE_TITLE_KEY};

/// A historical row ready for analysis: rates in percent, tags split out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeroObservation {
    pub hero_id: u32,
    pub hero_name: String,
    pub roles: Vec<String>,
    pub primary_role: String,
    pub lanes: Vec<String>,
    pub primary_lane: String,
    pub win_rate_pct: f64,
    pub ban_rate_pct: f64,
    pub extraction_date: NaiveDate,
}

pub fn to_percent(fraction: f64) -> f64 {
    fraction * 100.0
}

pub fn from_percent(pct: f64) -> f64 {
    pct / 100.0
}

/// Convert stored rows into observations. Rows without a hero name, a win
/// rate or a ban rate are dropped; unreadable tags become "Unknown".
pub fn preprocess(records: &[HistoricalRecord]) -> Vec<HeroObservation> {
    records.iter().filter_map(observe).collect()
}

fn observe(r: &HistoricalRecord) -> Option<HeroObservation> {
    let hero_name = r.hero_name.trim();
    if hero_name.is_empty() {
        return None;
    }

    let rates = stored_rates(r);
    let win_rate = rates.win_rate?;
    let ban_rate = rates.ban_rate?;

    let roles = tag_titles(&r.roles, &r.raw_roles, ROLE_TITLE_KEY);
    let lanes = tag_titles(&r.lanes, &r.raw_lanes, LANE_TITLE_KEY);

    Some(HeroObservation {
        hero_id: r.hero_id,
        hero_name: hero_name.to_string(),
        primary_role: roles[0].clone(),
        primary_lane: lanes[0].clone(),
        roles,
        lanes,
        win_rate_pct: to_percent(win_rate),
        ban_rate_pct: to_percent(ban_rate),
        extraction_date: r.extraction_date,
    })
}

/// Typed columns first; rows written without them fall back to the `data` JSON.
fn stored_rates(r: &HistoricalRecord) -> LatestRates {
    if r.win_rate.is_some() && r.ban_rate.is_some() {
        return LatestRates {
            win_rate: r.win_rate,
            ban_rate: r.ban_rate,
            app_rate: r.app_rate,
        };
    }
    let parsed = LatestRates::from_payload_text(&r.data).unwrap_or_default();
    LatestRates {
        win_rate: r.win_rate.or(parsed.win_rate),
        ban_rate: r.ban_rate.or(parsed.ban_rate),
        app_rate: r.app_rate.or(parsed.app_rate),
    }
}

/// Never empty: falls back to ["Unknown"].
fn tag_titles(joined: &str, raw: &str, title_key: &str) -> Vec<String> {
    let mut titles: Vec<String> = joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if titles.is_empty() {
        titles = Tag::parse_list_text(raw, title_key)
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.title)
            .collect();
    }
    if titles.is_empty() {
        titles.push(UNKNOWN_LABEL.to_string());
    }
    titles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::historical::tests::record;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    #[test]
    fn percent_conversion_stays_in_range_and_round_trips() {
        let records: Vec<HistoricalRecord> = [0.0, 0.123, 0.5, 0.987654321, 1.0]
            .iter()
            .enumerate()
            .map(|(i, &w)| record(i as u32 + 1, "Hero", w, 1.0 - w, day()))
            .collect();

        let obs = preprocess(&records);
        assert_eq!(obs.len(), records.len());
        for (o, r) in obs.iter().zip(&records) {
            assert!((0.0..=100.0).contains(&o.win_rate_pct));
            assert!((0.0..=100.0).contains(&o.ban_rate_pct));
            let back = from_percent(o.win_rate_pct);
            assert!((back - r.win_rate.unwrap_or(f64::NAN)).abs() < 1e-12);
        }
    }

    #[test]
    fn falls_back_to_payload_and_raw_tags() {
        let mut r = record(5, "Zilong", 0.3, 0.3, day());
        r.win_rate = None;
        r.ban_rate = None;
        r.data = r#"{"win_rate":[{"win_rate":0.4},{"win_rate":0.52,"ban_rate":0.10}]}"#.to_string();
        r.roles = String::new();
        r.raw_roles = r#"[{"data":{"sort_title":"Fighter"}},{"data":{"sort_title":"Assassin"}}]"#.to_string();

        let obs = preprocess(&[r]);
        assert_eq!(obs.len(), 1);
        assert!((obs[0].win_rate_pct - 52.0).abs() < 1e-9);
        assert!((obs[0].ban_rate_pct - 10.0).abs() < 1e-9);
        assert_eq!(obs[0].roles, vec!["Fighter", "Assassin"]);
        assert_eq!(obs[0].primary_role, "Fighter");
    }

    #[test]
    fn malformed_tags_become_unknown() {
        let mut r = record(6, "Eudora", 0.5, 0.1, day());
        r.roles = String::new();
        r.raw_roles = "{not json".to_string();
        r.lanes = String::new();
        r.raw_lanes = String::new();

        let obs = preprocess(&[r]);
        assert_eq!(obs[0].primary_role, UNKNOWN_LABEL);
        assert_eq!(obs[0].primary_lane, UNKNOWN_LABEL);
    }

    #[test]
    fn rows_missing_rates_or_name_are_dropped() {
        let mut no_rates = record(7, "Alice", 0.5, 0.1, day());
        no_rates.win_rate = None;
        no_rates.data = "garbage".to_string();
        let mut no_name = record(8, "  ", 0.5, 0.1, day());
        no_name.hero_name = "  ".to_string();

        assert!(preprocess(&[no_rates, no_name]).is_empty());
    }
}
