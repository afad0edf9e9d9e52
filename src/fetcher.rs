use std::future::Future;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;

/// Anything that can answer a GET for an endpoint path with a JSON body.
/// The pipeline only talks to the upstream API through this trait.
pub trait JsonSource {
    fn get_json(&self, endpoint: &str) -> impl Future<Output = Result<Value>>;
}

pub fn positions_endpoint(page_size: usize) -> String {
    format!("hero-position/?size={page_size}")
}

pub fn hero_rate_endpoint(hero_id: u32) -> String {
    format!("hero-rate/{hero_id}/")
}

/// Single-attempt GET client for the upstream stats API.
pub struct Fetcher {
    client: reqwest::Client,
    base_url: String,
}

impl Fetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: cfg.api_base_url.clone(),
        })
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn try_get(&self, url: &str) -> Result<Value> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }
}

impl JsonSource for Fetcher {
    /// Status >= 400, connection failures and undecodable bodies are logged
    /// and returned as errors; nothing is retried.
    async fn get_json(&self, endpoint: &str) -> Result<Value> {
        let url = self.url_for(endpoint);
        debug!("GET {url}");
        match self.try_get(&url).await {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!(endpoint = %endpoint, "request failed: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_upstream_paths() {
        assert_eq!(positions_endpoint(200), "hero-position/?size=200");
        assert_eq!(hero_rate_endpoint(7), "hero-rate/7/");
    }

    #[test]
    fn url_joins_base_and_endpoint() {
        let cfg = Config {
            api_base_url: "http://localhost:9999/api".to_string(),
            ..Config::default()
        };
        let fetcher = Fetcher::new(&cfg).expect("client builds");
        assert_eq!(
            fetcher.url_for("/hero-rate/3/"),
            "http://localhost:9999/api/hero-rate/3/"
        );
    }
}
