use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the historical table. Field order is the CSV column order.
///
/// `roles`/`lanes` hold comma-joined tag titles; `raw_roles`, `raw_lanes` and
/// `data` hold the upstream JSON as compact text. `extraction_date` is written
/// as `YYYY-MM-DD`.
///
/// The aliases read the older flattened layout
/// (`hero_id, hero.data.name, hero.data.sortid, hero.data.roadsort, data, extraction_date`),
/// which has no joined tag or typed rate columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub hero_id: u32,
    #[serde(alias = "hero.data.name")]
    pub hero_name: String,
    #[serde(default)]
    pub roles: String,
    #[serde(default)]
    pub lanes: String,
    #[serde(default, alias = "hero.data.sortid")]
    pub raw_roles: String,
    #[serde(default, alias = "hero.data.roadsort")]
    pub raw_lanes: String,
    #[serde(default)]
    pub win_rate: Option<f64>,
    #[serde(default)]
    pub ban_rate: Option<f64>,
    #[serde(default)]
    pub app_rate: Option<f64>,
    #[serde(default)]
    pub data: String,
    pub extraction_date: NaiveDate,
}

impl HistoricalRecord {
    pub fn key(&self) -> (u32, NaiveDate) {
        (self.hero_id, self.extraction_date)
    }
}
