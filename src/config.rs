use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const API_BASE_URL: &str = "https://mlbb-stats.ridwaanhall.com/api";
pub const DASHBOARD_API_URL: &str = "http://127.0.0.1:8000";
pub const REMOTE_CSV_URL: &str =
    "https://raw.githubusercontent.com/STpipa/MLBB-EDA-Project/main/data/mobile_legends_data_historical.csv";

pub const HISTORICAL_FILE_NAME: &str = "mobile_legends_data_historical.csv";
pub const LATEST_FILE_NAME: &str = "mobile_legends_data_clean.csv";

/// Courtesy delay between per-hero rate requests (milliseconds).
pub const REQUEST_DELAY_MS: u64 = 100;

/// Page size for the bulk positions request. Must exceed the roster size.
pub const POSITIONS_PAGE_SIZE: usize = 200;

/// Number of heroes listed in each report section.
pub mod report_limits {
    pub const TOP_WIN_RATE: usize = 5;
    pub const TOP_BAN_RATE: usize = 5;
    pub const TOP_MOVERS: usize = 3;
}

/// Fallback for rows whose role or lane tags cannot be parsed.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub log_level: String,
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub api_port: u16,
    pub request_delay: Duration,
    pub positions_page_size: usize,
    /// When set (HERO_ID_RANGE_END), rates are collected for the fixed range 1..=N
    /// instead of the roster discovered from the positions endpoint.
    pub hero_id_range_end: Option<u32>,
    /// Base URL of the local read API, used by the dashboard (DASHBOARD_API_URL)
    pub dashboard_api_url: String,
    /// Last-resort CSV source for the dashboard (REMOTE_CSV_URL)
    pub remote_csv_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            reports_dir: std::env::var("REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("reports")),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            request_delay: Duration::from_millis(
                std::env::var("REQUEST_DELAY_MS")
                    .unwrap_or_else(|_| REQUEST_DELAY_MS.to_string())
                    .parse::<u64>()
                    .map_err(|_| {
                        AppError::Config("REQUEST_DELAY_MS must be a whole number".to_string())
                    })?,
            ),
            positions_page_size: match std::env::var("POSITIONS_PAGE_SIZE") {
                Ok(v) => parse_page_size(&v)?,
                Err(_) => POSITIONS_PAGE_SIZE,
            },
            hero_id_range_end: match std::env::var("HERO_ID_RANGE_END") {
                Ok(v) if !v.trim().is_empty() => Some(v.trim().parse::<u32>().map_err(|_| {
                    AppError::Config("HERO_ID_RANGE_END must be a positive integer".to_string())
                })?),
                _ => None,
            },
            dashboard_api_url: std::env::var("DASHBOARD_API_URL")
                .unwrap_or_else(|_| DASHBOARD_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            remote_csv_url: std::env::var("REMOTE_CSV_URL")
                .unwrap_or_else(|_| REMOTE_CSV_URL.to_string()),
        })
    }

    pub fn historical_path(&self) -> PathBuf {
        self.data_dir.join(HISTORICAL_FILE_NAME)
    }

    pub fn latest_path(&self) -> PathBuf {
        self.data_dir.join(LATEST_FILE_NAME)
    }
}

fn parse_page_size(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::Config(
            "POSITIONS_PAGE_SIZE must be a positive whole number".to_string(),
        )),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: API_BASE_URL.to_string(),
            log_level: "info".to_string(),
            data_dir: PathBuf::from("data"),
            reports_dir: PathBuf::from("reports"),
            api_port: 8000,
            request_delay: Duration::from_millis(REQUEST_DELAY_MS),
            positions_page_size: POSITIONS_PAGE_SIZE,
            hero_id_range_end: None,
            dashboard_api_url: DASHBOARD_API_URL.to_string(),
            remote_csv_url: REMOTE_CSV_URL.to_string(),
        }
    }
}
