use std::fmt;
use std::path::PathBuf;

use mlbb_meta_tracker::analysis::aggregate::{
    distinct_dates, hero_change, hero_history, hero_names, latest, mean_by_role, meta_average,
    top_by_win_rate,
};
use mlbb_meta_tracker::analysis::{preprocess, GroupAverage, HeroObservation, TrendReport};
use mlbb_meta_tracker::config::Config;
use mlbb_meta_tracker::store::{read_records, HistoricalRecord, HistoricalStore};

// ---------------------------------------------------------------------------
// Data loading
// ---------------------------------------------------------------------------

/// Where the currently displayed table came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    LocalApi(String),
    LocalCsv(PathBuf),
    RemoteCsv(String),
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::LocalApi(url) => write!(f, "local API {url}"),
            DataSource::LocalCsv(path) => write!(f, "local CSV {}", path.display()),
            DataSource::RemoteCsv(url) => write!(f, "remote CSV {url}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadResult {
    pub loaded: Option<(DataSource, Vec<HistoricalRecord>)>,
    /// One line per source that was tried and failed.
    pub warnings: Vec<String>,
}

/// Try the local API, then the local CSV, then the remote CSV.
pub async fn load_records(client: &reqwest::Client, cfg: &Config) -> LoadResult {
    let mut result = LoadResult::default();

    let api_url = format!("{}/data", cfg.dashboard_api_url);
    match fetch_api(client, &api_url).await {
        Ok(rows) => {
            result.loaded = Some((DataSource::LocalApi(api_url), rows));
            return result;
        }
        Err(e) => result.warnings.push(format!("local API unavailable ({e})")),
    }

    let store = HistoricalStore::new(cfg);
    match store.load() {
        Ok(rows) => {
            result.loaded = Some((DataSource::LocalCsv(store.historical_path().to_path_buf()), rows));
            return result;
        }
        Err(e) => result.warnings.push(format!("local CSV unavailable ({e})")),
    }

    match fetch_remote_csv(client, &cfg.remote_csv_url).await {
        Ok(rows) => {
            result.loaded = Some((DataSource::RemoteCsv(cfg.remote_csv_url.clone()), rows));
        }
        Err(e) => result.warnings.push(format!("remote CSV unavailable ({e})")),
    }
    result
}

async fn fetch_api(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<HistoricalRecord>, reqwest::Error> {
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<HistoricalRecord>>()
        .await
}

async fn fetch_remote_csv(
    client: &reqwest::Client,
    url: &str,
) -> mlbb_meta_tracker::error::Result<Vec<HistoricalRecord>> {
    let text = client.get(url).send().await?.error_for_status()?.text().await?;
    read_records(text.as_bytes())
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Meta,
    Trend,
    Hero,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Meta, Tab::Trend, Tab::Hero];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Meta => "Meta",
            Tab::Trend => "Trend",
            Tab::Hero => "Hero",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

/// Everything the tabs render, computed once per load.
#[derive(Debug, Clone, Default)]
pub struct Views {
    pub observations: Vec<HeroObservation>,
    pub role_averages: Vec<GroupAverage>,
    pub latest_heroes: Vec<HeroObservation>,
    pub report_text: String,
    pub hero_names: Vec<String>,
    pub meta_average: Option<f64>,
    pub dates: usize,
}

impl Views {
    pub fn build(records: &[HistoricalRecord]) -> Self {
        let observations = preprocess(records);
        let current = latest(&observations);
        let latest_heroes = top_by_win_rate(&current, current.len())
            .into_iter()
            .cloned()
            .collect();
        let report_text = TrendReport::build(&observations)
            .map(|r| r.render())
            .unwrap_or_else(|| "No usable rows loaded.".to_string());

        Self {
            role_averages: mean_by_role(&current),
            meta_average: meta_average(&current),
            hero_names: hero_names(&observations),
            dates: distinct_dates(&observations).len(),
            latest_heroes,
            report_text,
            observations,
        }
    }
}

/// One hero's history, ready for the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct HeroDetail {
    pub name: String,
    pub role: String,
    pub lane: String,
    pub win_rate_pct: f64,
    pub ban_rate_pct: f64,
    /// Change vs the previous extraction, in percentage points.
    pub change_pp: f64,
    /// (days since first observation, win rate %)
    pub points: Vec<(f64, f64)>,
    pub first_date: String,
    pub last_date: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub cfg: Config,
    pub source: Option<DataSource>,
    pub warnings: Vec<String>,
    pub views: Views,
    pub tab: Tab,
    pub selected_hero: usize,
    loaded: bool,
}

impl AppState {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            source: None,
            warnings: Vec::new(),
            views: Views::default(),
            tab: Tab::Meta,
            selected_hero: 0,
            loaded: false,
        }
    }

    /// Loads once; later calls reuse the cached views.
    pub async fn ensure_loaded(&mut self, client: &reqwest::Client) {
        if !self.loaded {
            self.reload(client).await;
        }
    }

    /// Drop the cache and load again through the fallback chain.
    pub async fn reload(&mut self, client: &reqwest::Client) {
        let result = load_records(client, &self.cfg).await;
        self.apply(result);
    }

    pub fn apply(&mut self, result: LoadResult) {
        self.warnings = result.warnings;
        match result.loaded {
            Some((source, rows)) => {
                self.views = Views::build(&rows);
                self.source = Some(source);
            }
            None => {
                self.views = Views::default();
                self.source = None;
                self.warnings.push("no data source available".to_string());
            }
        }
        self.selected_hero = self
            .selected_hero
            .min(self.views.hero_names.len().saturating_sub(1));
        self.loaded = true;
    }

    pub fn select_next_hero(&mut self) {
        let max = self.views.hero_names.len().saturating_sub(1);
        self.selected_hero = (self.selected_hero + 1).min(max);
    }

    pub fn select_prev_hero(&mut self) {
        self.selected_hero = self.selected_hero.saturating_sub(1);
    }

    pub fn hero_detail(&self) -> Option<HeroDetail> {
        let name = self.views.hero_names.get(self.selected_hero)?;
        let history = hero_history(&self.views.observations, name);
        let first = history.first()?;
        let last = history.last()?;

        let points = history
            .iter()
            .map(|o| {
                let days = (o.extraction_date - first.extraction_date).num_days() as f64;
                (days, o.win_rate_pct)
            })
            .collect();

        Some(HeroDetail {
            name: name.clone(),
            role: last.roles.join(", "),
            lane: last.lanes.join(", "),
            win_rate_pct: last.win_rate_pct,
            ban_rate_pct: last.ban_rate_pct,
            change_pp: hero_change(&history),
            points,
            first_date: first.extraction_date.format("%Y-%m-%d").to_string(),
            last_date: last.extraction_date.format("%Y-%m-%d").to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_pct(v: f64) -> String {
    format!("{v:.2}%")
}

pub fn format_change(pp: f64) -> String {
    format!("{pp:+.2} pp")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
