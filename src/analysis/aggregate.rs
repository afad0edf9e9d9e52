use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::preprocess::HeroObservation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAverage {
    pub key: String,
    pub win_rate_pct: f64,
    pub ban_rate_pct: f64,
    pub count: usize,
}

/// Five-number summary of win rate % for one group (role or lane).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub key: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeroDelta {
    pub hero_id: u32,
    pub hero_name: String,
    pub previous_pct: f64,
    pub latest_pct: f64,
    /// Percentage points, latest minus previous.
    pub change_pp: f64,
}

/// Win-rate movement between the two most recent extraction dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub previous_date: NaiveDate,
    pub latest_date: NaiveDate,
    /// Sorted by `change_pp`, largest gain first.
    pub deltas: Vec<HeroDelta>,
}

impl Trend {
    pub fn top_gainers(&self, n: usize) -> &[HeroDelta] {
        &self.deltas[..n.min(self.deltas.len())]
    }

    /// Largest losses first.
    pub fn top_losers(&self, n: usize) -> Vec<&HeroDelta> {
        self.deltas.iter().rev().take(n).collect()
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

pub fn distinct_dates(obs: &[HeroObservation]) -> Vec<NaiveDate> {
    obs.iter()
        .map(|o| o.extraction_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn latest_date(obs: &[HeroObservation]) -> Option<NaiveDate> {
    obs.iter().map(|o| o.extraction_date).max()
}

pub fn on_date(obs: &[HeroObservation], date: NaiveDate) -> Vec<HeroObservation> {
    obs.iter()
        .filter(|o| o.extraction_date == date)
        .cloned()
        .collect()
}

/// Rows of the most recent extraction date.
pub fn latest(obs: &[HeroObservation]) -> Vec<HeroObservation> {
    latest_date(obs).map(|d| on_date(obs, d)).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Group-by averages
// ---------------------------------------------------------------------------

/// Mean win/ban % per group, best win rate first.
pub fn mean_by<F>(obs: &[HeroObservation], key: F) -> Vec<GroupAverage>
where
    F: Fn(&HeroObservation) -> &str,
{
    let mut sums: BTreeMap<&str, (f64, f64, usize)> = BTreeMap::new();
    for o in obs {
        let entry = sums.entry(key(o)).or_insert((0.0, 0.0, 0));
        entry.0 += o.win_rate_pct;
        entry.1 += o.ban_rate_pct;
        entry.2 += 1;
    }

    let mut groups: Vec<GroupAverage> = sums
        .into_iter()
        .map(|(k, (win, ban, n))| GroupAverage {
            key: k.to_string(),
            win_rate_pct: win / n as f64,
            ban_rate_pct: ban / n as f64,
            count: n,
        })
        .collect();
    groups.sort_by(|a, b| b.win_rate_pct.total_cmp(&a.win_rate_pct));
    groups
}

pub fn mean_by_role(obs: &[HeroObservation]) -> Vec<GroupAverage> {
    mean_by(obs, |o| o.primary_role.as_str())
}

pub fn mean_by_lane(obs: &[HeroObservation]) -> Vec<GroupAverage> {
    mean_by(obs, |o| o.primary_lane.as_str())
}

pub fn mean_by_hero(obs: &[HeroObservation]) -> Vec<GroupAverage> {
    mean_by(obs, |o| o.hero_name.as_str())
}

/// Average win rate % across all observations.
pub fn meta_average(obs: &[HeroObservation]) -> Option<f64> {
    if obs.is_empty() {
        return None;
    }
    Some(obs.iter().map(|o| o.win_rate_pct).sum::<f64>() / obs.len() as f64)
}

pub fn role_distributions(obs: &[HeroObservation]) -> Vec<GroupDistribution> {
    distributions_by(obs, |o| o.primary_role.as_str())
}

pub fn lane_distributions(obs: &[HeroObservation]) -> Vec<GroupDistribution> {
    distributions_by(obs, |o| o.primary_lane.as_str())
}

pub fn distributions_by<F>(obs: &[HeroObservation], key: F) -> Vec<GroupDistribution>
where
    F: Fn(&HeroObservation) -> &str,
{
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for o in obs {
        groups.entry(key(o)).or_default().push(o.win_rate_pct);
    }

    groups
        .into_iter()
        .map(|(k, mut values)| {
            values.sort_by(f64::total_cmp);
            GroupDistribution {
                key: k.to_string(),
                min: values[0],
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values[values.len() - 1],
                count: values.len(),
            }
        })
        .collect()
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

pub fn top_by_win_rate(obs: &[HeroObservation], n: usize) -> Vec<&HeroObservation> {
    top_by(obs, n, |o| o.win_rate_pct)
}

pub fn top_by_ban_rate(obs: &[HeroObservation], n: usize) -> Vec<&HeroObservation> {
    top_by(obs, n, |o| o.ban_rate_pct)
}

fn top_by<F>(obs: &[HeroObservation], n: usize, metric: F) -> Vec<&HeroObservation>
where
    F: Fn(&HeroObservation) -> f64,
{
    let mut ranked: Vec<&HeroObservation> = obs.iter().collect();
    ranked.sort_by(|a, b| metric(b).total_cmp(&metric(a)));
    ranked.truncate(n);
    ranked
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

/// Compare the latest and second-latest dates. None with fewer than two dates.
pub fn win_rate_trend(obs: &[HeroObservation]) -> Option<Trend> {
    let dates = distinct_dates(obs);
    if dates.len() < 2 {
        return None;
    }
    let latest_date = dates[dates.len() - 1];
    let previous_date = dates[dates.len() - 2];

    let previous: HashMap<u32, f64> = obs
        .iter()
        .filter(|o| o.extraction_date == previous_date)
        .map(|o| (o.hero_id, o.win_rate_pct))
        .collect();

    let mut latest_by_hero: BTreeMap<u32, &HeroObservation> = BTreeMap::new();
    for o in obs.iter().filter(|o| o.extraction_date == latest_date) {
        latest_by_hero.insert(o.hero_id, o);
    }

    let mut deltas: Vec<HeroDelta> = latest_by_hero
        .into_values()
        .filter_map(|o| {
            let prev = *previous.get(&o.hero_id)?;
            Some(HeroDelta {
                hero_id: o.hero_id,
                hero_name: o.hero_name.clone(),
                previous_pct: prev,
                latest_pct: o.win_rate_pct,
                change_pp: o.win_rate_pct - prev,
            })
        })
        .collect();
    deltas.sort_by(|a, b| b.change_pp.total_cmp(&a.change_pp));

    Some(Trend {
        previous_date,
        latest_date,
        deltas,
    })
}

/// All observations of one hero, oldest first.
pub fn hero_history<'a>(obs: &'a [HeroObservation], hero_name: &str) -> Vec<&'a HeroObservation> {
    let mut history: Vec<&HeroObservation> =
        obs.iter().filter(|o| o.hero_name == hero_name).collect();
    history.sort_by_key(|o| o.extraction_date);
    history
}

/// Change in win rate % between a hero's two most recent observations;
/// 0.0 when there is only one.
pub fn hero_change(history: &[&HeroObservation]) -> f64 {
    match history {
        [.., prev, last] => last.win_rate_pct - prev.win_rate_pct,
        _ => 0.0,
    }
}

/// Sorted distinct hero names.
pub fn hero_names(obs: &[HeroObservation]) -> Vec<String> {
    obs.iter()
        .map(|o| o.hero_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn obs(id: u32, name: &str, role: &str, win: f64, ban: f64, date: NaiveDate) -> HeroObservation {
        HeroObservation {
            hero_id: id,
            hero_name: name.to_string(),
            roles: vec![role.to_string()],
            primary_role: role.to_string(),
            lanes: vec!["Jungle".to_string()],
            primary_lane: "Jungle".to_string(),
            win_rate_pct: win,
            ban_rate_pct: ban,
            extraction_date: date,
        }
    }

    pub(crate) fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).expect("valid date")
    }

    #[test]
    fn gain_is_reported_in_percentage_points() {
        let history = vec![
            obs(1, "Fanny", "Assassin", 50.0, 10.0, day(1)),
            obs(2, "Tigreal", "Tank", 52.0, 1.0, day(1)),
            obs(3, "Layla", "Marksman", 49.0, 0.5, day(1)),
            obs(1, "Fanny", "Assassin", 53.5, 12.0, day(8)),
            obs(2, "Tigreal", "Tank", 51.0, 1.0, day(8)),
            obs(3, "Layla", "Marksman", 50.0, 0.5, day(8)),
        ];

        let trend = win_rate_trend(&history).expect("two dates");
        assert_eq!(trend.previous_date, day(1));
        assert_eq!(trend.latest_date, day(8));

        let top = &trend.top_gainers(3)[0];
        assert_eq!(top.hero_name, "Fanny");
        assert!((top.change_pp - 3.5).abs() < 1e-9);

        let worst = trend.top_losers(1)[0];
        assert_eq!(worst.hero_name, "Tigreal");
        assert!((worst.change_pp + 1.0).abs() < 1e-9);
    }

    #[test]
    fn trend_uses_two_most_recent_dates_only() {
        let history = vec![
            obs(1, "Fanny", "Assassin", 40.0, 0.0, day(1)),
            obs(1, "Fanny", "Assassin", 50.0, 0.0, day(9)),
            obs(1, "Fanny", "Assassin", 45.0, 0.0, day(5)),
        ];
        let trend = win_rate_trend(&history).expect("three dates");
        assert_eq!(trend.previous_date, day(5));
        assert!((trend.deltas[0].change_pp - 5.0).abs() < 1e-9);
    }

    #[test]
    fn single_date_has_no_trend() {
        let history = vec![obs(1, "Fanny", "Assassin", 40.0, 0.0, day(1))];
        assert!(win_rate_trend(&history).is_none());
    }

    #[test]
    fn heroes_missing_from_previous_date_are_not_ranked() {
        let history = vec![
            obs(1, "Fanny", "Assassin", 40.0, 0.0, day(1)),
            obs(1, "Fanny", "Assassin", 41.0, 0.0, day(2)),
            obs(2, "Novaria", "Mage", 60.0, 0.0, day(2)),
        ];
        let trend = win_rate_trend(&history).expect("two dates");
        assert_eq!(trend.deltas.len(), 1);
    }

    #[test]
    fn role_means_are_sorted_best_first() {
        let rows = vec![
            obs(1, "A", "Tank", 48.0, 2.0, day(1)),
            obs(2, "B", "Tank", 50.0, 4.0, day(1)),
            obs(3, "C", "Mage", 55.0, 1.0, day(1)),
        ];
        let by_role = mean_by_role(&rows);
        assert_eq!(by_role[0].key, "Mage");
        assert_eq!(by_role[1].key, "Tank");
        assert!((by_role[1].win_rate_pct - 49.0).abs() < 1e-9);
        assert!((by_role[1].ban_rate_pct - 3.0).abs() < 1e-9);
        assert_eq!(by_role[1].count, 2);
        assert_eq!(mean_by_lane(&rows).len(), 1);
    }

    #[test]
    fn distribution_quartiles_interpolate() {
        let rows: Vec<HeroObservation> = [40.0, 45.0, 50.0, 55.0, 60.0]
            .iter()
            .enumerate()
            .map(|(i, &w)| obs(i as u32, "X", "Fighter", w, 0.0, day(1)))
            .collect();
        let dist = &role_distributions(&rows)[0];
        assert_eq!((dist.min, dist.q1, dist.median, dist.q3, dist.max), (40.0, 45.0, 50.0, 55.0, 60.0));
    }

    #[test]
    fn lane_distributions_group_by_primary_lane() {
        let mut gold = obs(1, "Layla", "Marksman", 48.0, 0.0, day(1));
        gold.primary_lane = "Gold Lane".to_string();
        let rows = vec![
            gold,
            obs(2, "Fanny", "Assassin", 52.0, 0.0, day(1)),
            obs(3, "Ling", "Assassin", 50.0, 0.0, day(1)),
        ];
        let dists = lane_distributions(&rows);
        assert_eq!(dists.len(), 2);
        assert_eq!(dists[0].key, "Gold Lane");
        assert_eq!(dists[1].key, "Jungle");
        assert_eq!(dists[1].count, 2);
        assert_eq!(dists[1].median, 51.0);
    }

    #[test]
    fn rankings_and_latest_filter() {
        let rows = vec![
            obs(1, "A", "Tank", 48.0, 20.0, day(1)),
            obs(2, "B", "Tank", 58.0, 4.0, day(2)),
            obs(3, "C", "Mage", 55.0, 30.0, day(2)),
        ];
        let latest_rows = latest(&rows);
        assert_eq!(latest_rows.len(), 2);
        assert_eq!(top_by_win_rate(&latest_rows, 1)[0].hero_name, "B");
        assert_eq!(top_by_ban_rate(&latest_rows, 5)[0].hero_name, "C");
        assert_eq!(top_by_ban_rate(&latest_rows, 5).len(), 2);
    }

    #[test]
    fn hero_change_uses_last_two_points() {
        let rows = vec![
            obs(1, "A", "Tank", 51.0, 0.0, day(3)),
            obs(1, "A", "Tank", 47.0, 0.0, day(1)),
            obs(1, "A", "Tank", 50.0, 0.0, day(2)),
        ];
        let history = hero_history(&rows, "A");
        assert_eq!(history[0].extraction_date, day(1));
        assert!((hero_change(&history) - 1.0).abs() < 1e-9);
        assert_eq!(hero_change(&history[..1]), 0.0);
    }
}
