pub mod historical;
pub mod models;

pub use historical::{read_records, AppendOutcome, HistoricalStore};
pub use models::HistoricalRecord;
