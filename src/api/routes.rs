use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analysis::aggregate::{latest, mean_by_role, GroupAverage};
use crate::analysis::preprocess;
use crate::api::health::HealthState;
use crate::error::{AppError, Result};
use crate::store::{HistoricalRecord, HistoricalStore};

#[derive(Clone)]
pub struct ApiState {
    pub store: HistoricalStore,
    pub health: Arc<HealthState>,
}

impl ApiState {
    pub fn new(store: HistoricalStore) -> Self {
        Self {
            store,
            health: Arc::new(HealthState::new()),
        }
    }

    /// The table is re-read on every request so new extractions show up
    /// without a restart.
    fn load(&self) -> Result<Vec<HistoricalRecord>> {
        let loaded = self.store.load();
        self.health.record_load(loaded.is_ok());
        loaded
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/data", get(get_data))
        .route("/data/latest", get(get_latest))
        .route("/stats/roles", get(get_role_stats))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct DataQuery {
    pub hero: Option<String>,
    pub since: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct HealthResponse {
    pub historical_file_present: bool,
    pub rows: usize,
    pub latest_extraction_date: Option<NaiveDate>,
    pub loads_ok: u64,
    pub loads_failed: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_data(
    State(state): State<ApiState>,
    Query(params): Query<DataQuery>,
) -> std::result::Result<Json<Vec<HistoricalRecord>>, AppError> {
    let rows = state
        .load()?
        .into_iter()
        .filter(|r| {
            params
                .hero
                .as_ref()
                .map_or(true, |h| r.hero_name.eq_ignore_ascii_case(h))
        })
        .filter(|r| params.since.map_or(true, |d| r.extraction_date >= d))
        .collect();
    Ok(Json(rows))
}

async fn get_latest(
    State(state): State<ApiState>,
) -> std::result::Result<Json<Vec<HistoricalRecord>>, AppError> {
    let rows = state.load()?;
    let Some(date) = rows.iter().map(|r| r.extraction_date).max() else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(
        rows.into_iter()
            .filter(|r| r.extraction_date == date)
            .collect(),
    ))
}

async fn get_role_stats(
    State(state): State<ApiState>,
) -> std::result::Result<Json<Vec<GroupAverage>>, AppError> {
    let obs = preprocess(&state.load()?);
    Ok(Json(mean_by_role(&latest(&obs))))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let present = state.store.exists();
    // Read past the counters so polling /health leaves them unchanged.
    let rows = if present { state.store.load().ok() } else { None };
    Json(HealthResponse {
        historical_file_present: present,
        rows: rows.as_ref().map_or(0, Vec::len),
        latest_extraction_date: rows
            .as_ref()
            .and_then(|r| r.iter().map(|x| x.extraction_date).max()),
        loads_ok: state.health.loads_ok(),
        loads_failed: state.health.loads_failed(),
    })
}
