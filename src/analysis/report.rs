use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::analysis::aggregate::{latest, latest_date, top_by_ban_rate, top_by_win_rate, win_rate_trend, Trend};
use crate::analysis::preprocess::HeroObservation;
use crate::config::report_limits;
use crate::error::{AppError, Result};

/// Plain-text weekly trend report over the preprocessed history.
#[derive(Debug, Clone)]
pub struct TrendReport {
    pub latest_date: NaiveDate,
    pub top_win: Vec<HeroObservation>,
    pub top_ban: Vec<HeroObservation>,
    pub trend: Option<Trend>,
}

impl TrendReport {
    /// None when there are no observations at all.
    pub fn build(obs: &[HeroObservation]) -> Option<Self> {
        let latest_date = latest_date(obs)?;
        let current = latest(obs);
        Some(Self {
            latest_date,
            top_win: top_by_win_rate(&current, report_limits::TOP_WIN_RATE)
                .into_iter()
                .cloned()
                .collect(),
            top_ban: top_by_ban_rate(&current, report_limits::TOP_BAN_RATE)
                .into_iter()
                .cloned()
                .collect(),
            trend: win_rate_trend(obs),
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "MLBB meta trend report ({})", self.latest_date.format("%Y-%m-%d"));
        let _ = writeln!(out, "{}", "=".repeat(40));

        let _ = writeln!(out, "\nTop {} heroes by win rate:", report_limits::TOP_WIN_RATE);
        for o in &self.top_win {
            let _ = writeln!(out, "- {}: {:.2}% win rate ({})", o.hero_name, o.win_rate_pct, o.primary_role);
        }

        let _ = writeln!(out, "\nTop {} heroes by ban rate:", report_limits::TOP_BAN_RATE);
        for o in &self.top_ban {
            let _ = writeln!(out, "- {}: {:.2}% ban rate ({})", o.hero_name, o.ban_rate_pct, o.primary_role);
        }

        match &self.trend {
            Some(trend) => {
                let _ = writeln!(
                    out,
                    "\nWin rate changes {} -> {}:",
                    trend.previous_date.format("%Y-%m-%d"),
                    trend.latest_date.format("%Y-%m-%d")
                );
                let _ = writeln!(out, "Top gainers:");
                for d in trend.top_gainers(report_limits::TOP_MOVERS) {
                    let _ = writeln!(out, "- {}: {:+.2} pp", d.hero_name, d.change_pp);
                }
                let _ = writeln!(out, "Top losers:");
                for d in trend.top_losers(report_limits::TOP_MOVERS) {
                    let _ = writeln!(out, "- {}: {:+.2} pp", d.hero_name, d.change_pp);
                }
            }
            None => {
                let _ = writeln!(out, "\nNot enough history to compute trends (need two extraction dates).");
            }
        }
        out
    }

    /// Write `trend_report_{YYYYMMDD}.txt` into `dir`, stamped with the
    /// latest extraction date the report covers.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("trend_report_{}.txt", self.latest_date.format("%Y%m%d")));
        fs::write(&path, self.render())?;
        info!("Trend report written to {}", path.display());
        Ok(path)
    }
}

/// Build and write the report, failing when there is nothing to report on.
pub fn generate_report(obs: &[HeroObservation], dir: &Path) -> Result<PathBuf> {
    let report = TrendReport::build(obs)
        .ok_or_else(|| AppError::NotFound("no usable historical rows to report on".to_string()))?;
    report.write_to(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate::tests::{day, obs};
    use crate::store::historical::tests::temp_dir;

    fn two_weeks() -> Vec<HeroObservation> {
        vec![
            obs(1, "Fanny", "Assassin", 50.0, 10.0, day(1)),
            obs(2, "Tigreal", "Tank", 52.0, 1.0, day(1)),
            obs(1, "Fanny", "Assassin", 53.5, 12.0, day(8)),
            obs(2, "Tigreal", "Tank", 51.0, 1.5, day(8)),
        ]
    }

    #[test]
    fn report_lists_rankings_and_movers() {
        let report = TrendReport::build(&two_weeks()).expect("has rows");
        let text = report.render();

        assert!(text.starts_with("MLBB meta trend report (2025-07-08)"));
        assert!(text.contains("- Fanny: 53.50% win rate (Assassin)"));
        assert!(text.contains("- Fanny: 12.00% ban rate (Assassin)"));
        assert!(text.contains("- Fanny: +3.50 pp"));
        assert!(text.contains("- Tigreal: -1.00 pp"));
        assert!(!text.contains("Not enough history"));
    }

    #[test]
    fn single_date_says_not_enough_history() {
        let rows = vec![obs(1, "Fanny", "Assassin", 50.0, 10.0, day(1))];
        let text = TrendReport::build(&rows).expect("has rows").render();
        assert!(text.contains("Not enough history"));
        assert!(!text.contains("Top gainers"));
    }

    #[test]
    fn rankings_are_capped() {
        let rows: Vec<HeroObservation> = (0..9)
            .map(|i| obs(i, &format!("H{i}"), "Mage", 40.0 + i as f64, i as f64, day(2)))
            .collect();
        let report = TrendReport::build(&rows).expect("has rows");
        assert_eq!(report.top_win.len(), report_limits::TOP_WIN_RATE);
        assert_eq!(report.top_win[0].hero_name, "H8");
        assert_eq!(report.top_ban.len(), report_limits::TOP_BAN_RATE);
    }

    #[test]
    fn report_file_is_named_by_latest_extraction_date() {
        let dir = temp_dir("report");
        let path = generate_report(&two_weeks(), &dir).expect("written");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("trend_report_20250708.txt"));
        let text = fs::read_to_string(&path).expect("read back");
        assert!(text.contains("Top gainers"));

        assert!(matches!(generate_report(&[], &dir), Err(AppError::NotFound(_))));
        let _ = fs::remove_dir_all(dir);
    }
}
