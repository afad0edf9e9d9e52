pub mod analysis;
pub mod api;
pub mod collector;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fetcher;
pub mod latency;
pub mod pipeline;
pub mod store;
pub mod types;
