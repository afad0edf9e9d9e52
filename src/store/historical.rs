use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::store::models::HistoricalRecord;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub written: usize,
    /// Rows dropped because the file already holds that (hero_id, extraction_date).
    pub skipped_existing: usize,
    pub created: bool,
}

/// Append-only historical CSV plus the overwritten latest-snapshot CSV.
#[derive(Debug, Clone)]
pub struct HistoricalStore {
    historical_path: PathBuf,
    latest_path: PathBuf,
}

impl HistoricalStore {
    pub fn new(cfg: &Config) -> Self {
        Self::with_paths(cfg.historical_path(), cfg.latest_path())
    }

    pub fn with_paths(historical_path: impl Into<PathBuf>, latest_path: impl Into<PathBuf>) -> Self {
        Self {
            historical_path: historical_path.into(),
            latest_path: latest_path.into(),
        }
    }

    pub fn historical_path(&self) -> &Path {
        &self.historical_path
    }

    pub fn latest_path(&self) -> &Path {
        &self.latest_path
    }

    pub fn exists(&self) -> bool {
        self.historical_path.is_file()
    }

    /// Append rows to the historical file, writing the header only when the
    /// file is new or empty. Rows already present for the same hero and date
    /// are skipped. All rows are encoded before the file is touched, so a
    /// failure never leaves a partial append behind.
    pub fn append(&self, records: &[HistoricalRecord]) -> Result<AppendOutcome> {
        ensure_parent(&self.historical_path)?;

        let has_content = fs::metadata(&self.historical_path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);

        let existing: HashSet<(u32, NaiveDate)> = if has_content {
            self.load()?.iter().map(HistoricalRecord::key).collect()
        } else {
            HashSet::new()
        };

        let mut seen = existing;
        let fresh: Vec<&HistoricalRecord> = records
            .iter()
            .filter(|r| seen.insert(r.key()))
            .collect();
        let skipped_existing = records.len() - fresh.len();
        if skipped_existing > 0 {
            warn!(
                "{skipped_existing} rows already stored for their extraction date, not appending them again"
            );
        }

        let bytes = encode(&fresh, !has_content)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.historical_path)?;
        file.write_all(&bytes)?;
        file.flush()?;

        info!(
            "Appended {} rows to {}",
            fresh.len(),
            self.historical_path.display()
        );

        Ok(AppendOutcome {
            written: fresh.len(),
            skipped_existing,
            created: !has_content,
        })
    }

    /// Replace the latest-snapshot file with exactly `records`.
    pub fn write_latest(&self, records: &[HistoricalRecord]) -> Result<()> {
        ensure_parent(&self.latest_path)?;
        let rows: Vec<&HistoricalRecord> = records.iter().collect();
        let bytes = encode(&rows, true)?;
        fs::write(&self.latest_path, bytes)?;
        info!("Latest snapshot written to {}", self.latest_path.display());
        Ok(())
    }

    /// Read the whole historical table. A missing file is `AppError::NotFound`.
    pub fn load(&self) -> Result<Vec<HistoricalRecord>> {
        let file = fs::File::open(&self.historical_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!(
                    "historical file {} does not exist",
                    self.historical_path.display()
                ))
            } else {
                AppError::Io(e)
            }
        })?;
        read_records(file)
    }
}

/// Decode historical rows from any CSV source. Rows that fail to decode are
/// skipped and counted in a warning. A table with data rows of which none
/// decode is `AppError::Schema`.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<HistoricalRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut bad_rows = 0usize;
    for row in reader.deserialize::<HistoricalRecord>() {
        match row {
            Ok(r) => records.push(r),
            Err(e) => {
                if bad_rows == 0 {
                    warn!("skipping undecodable historical row: {e}");
                }
                bad_rows += 1;
            }
        }
    }
    if bad_rows > 0 {
        if records.is_empty() {
            return Err(AppError::Schema(format!(
                "none of {bad_rows} rows match the historical columns"
            )));
        }
        warn!("{bad_rows} historical rows could not be decoded");
    }
    Ok(records)
}

fn encode(records: &[&HistoricalRecord], with_header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .has_headers(with_header)
        .from_writer(Vec::new());
    for r in records {
        writer.serialize(r)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    pub(crate) fn temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "mlbb-meta-{tag}-{}-{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    pub(crate) fn record(hero_id: u32, name: &str, win: f64, ban: f64, date: NaiveDate) -> HistoricalRecord {
        HistoricalRecord {
            hero_id,
            hero_name: name.to_string(),
            roles: "Fighter".to_string(),
            lanes: "Exp Lane".to_string(),
            raw_roles: r#"[{"data":{"sort_title":"Fighter"}}]"#.to_string(),
            raw_lanes: r#"[{"data":{"road_sort_title":"Exp Lane"}}]"#.to_string(),
            win_rate: Some(win),
            ban_rate: Some(ban),
            app_rate: None,
            data: format!(r#"{{"win_rate":[{{"win_rate":{win},"ban_rate":{ban}}}]}}"#),
            extraction_date: date,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).expect("valid date")
    }

    fn run(date: NaiveDate) -> Vec<HistoricalRecord> {
        vec![
            record(1, "Miya", 0.51, 0.02, date),
            record(2, "Balmond", 0.49, 0.01, date),
            record(3, "Saber", 0.50, 0.05, date),
        ]
    }

    #[test]
    fn two_runs_share_one_header() {
        let dir = temp_dir("append");
        let store = HistoricalStore::with_paths(dir.join("hist.csv"), dir.join("latest.csv"));

        let first = store.append(&run(day(1))).expect("first append");
        assert!(first.created);
        let second = store.append(&run(day(2))).expect("second append");
        assert!(!second.created);
        assert_eq!(second.written, 3);

        let text = fs::read_to_string(store.historical_path()).expect("read back");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 2 * 3);
        assert!(lines[0].starts_with("\"hero_id\",\"hero_name\""));
        assert_eq!(text.matches("hero_id").count(), 1);

        let loaded = store.load().expect("load");
        assert_eq!(loaded.len(), 6);
        assert!(loaded[..3].iter().all(|r| r.extraction_date == day(1)));
        assert!(loaded[3..].iter().all(|r| r.extraction_date == day(2)));
        assert_eq!(loaded[0], run(day(1))[0]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn same_day_rerun_does_not_duplicate_rows() {
        let dir = temp_dir("rerun");
        let store = HistoricalStore::with_paths(dir.join("hist.csv"), dir.join("latest.csv"));

        store.append(&run(day(4))).expect("first append");
        let again = store.append(&run(day(4))).expect("second append");
        assert_eq!(again.written, 0);
        assert_eq!(again.skipped_existing, 3);
        assert_eq!(store.load().expect("load").len(), 3);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn latest_snapshot_is_overwritten() {
        let dir = temp_dir("latest");
        let store = HistoricalStore::with_paths(dir.join("hist.csv"), dir.join("nested/latest.csv"));

        store.write_latest(&run(day(1))).expect("write");
        store.write_latest(&run(day(2))[..1]).expect("overwrite");

        let file = fs::File::open(store.latest_path()).expect("open latest");
        let rows = read_records(file).expect("decode");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].extraction_date, day(2));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = temp_dir("missing");
        let store = HistoricalStore::with_paths(dir.join("nope.csv"), dir.join("latest.csv"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(AppError::NotFound(_))));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn older_flattened_layout_decodes() {
        let csv_text = "\"hero_id\",\"hero.data.name\",\"hero.data.sortid\",\"hero.data.roadsort\",\"data\",\"extraction_date\"\n\
                        \"12\",\"Alucard\",\"[{'data': {'sort_title': 'Fighter'}}]\",\"[]\",\"{\"\"win_rate\"\": [{\"\"win_rate\"\": 0.51, \"\"ban_rate\"\": 0.02}]}\",\"2025-03-01\"\n";
        let rows = read_records(csv_text.as_bytes()).expect("decode");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hero_id, 12);
        assert_eq!(rows[0].hero_name, "Alucard");
        assert_eq!(rows[0].raw_roles, "[{'data': {'sort_title': 'Fighter'}}]");
        assert_eq!(rows[0].win_rate, None);
        assert!(rows[0].data.contains("0.51"));
        assert_eq!(rows[0].extraction_date, day(1));

        let obs = crate::analysis::preprocess(&rows);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].primary_role, "Fighter");
        assert!((obs[0].win_rate_pct - 51.0).abs() < 1e-9);
        assert!((obs[0].ban_rate_pct - 2.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_layout_is_an_error_not_an_empty_table() {
        let csv_text = "\"name\",\"score\"\n\"Miya\",\"3\"\n";
        assert!(matches!(read_records(csv_text.as_bytes()), Err(AppError::Schema(_))));

        let header_only = "\"hero_id\",\"hero_name\",\"extraction_date\"\n";
        assert!(read_records(header_only.as_bytes()).expect("empty table").is_empty());
    }

    #[test]
    fn empty_rate_cells_decode_as_none() {
        let csv_text = "\"hero_id\",\"hero_name\",\"roles\",\"lanes\",\"raw_roles\",\"raw_lanes\",\"win_rate\",\"ban_rate\",\"app_rate\",\"data\",\"extraction_date\"\n\
                        \"9\",\"Nana\",\"Mage\",\"\",\"[]\",\"[]\",\"\",\"0.2\",\"\",\"{}\",\"2025-03-01\"\n\
                        \"broken row\"\n";
        let rows = read_records(csv_text.as_bytes()).expect("decode");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].win_rate, None);
        assert_eq!(rows[0].ban_rate, Some(0.2));
    }
}
