//! PNG charts drawn straight onto an RGB buffer.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tracing::info;

use crate::analysis::aggregate::{
    lane_distributions, latest, latest_date, mean_by_lane, mean_by_role, role_distributions,
    GroupAverage, GroupDistribution,
};
use crate::analysis::preprocess::HeroObservation;
use crate::error::{AppError, Result};

const WIDTH: u32 = 900;
const HEIGHT: u32 = 600;
const MARGIN: u32 = 60;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const MEAN_MARKER: Rgb<u8> = Rgb([200, 30, 30]);

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
];

#[derive(Debug, Clone)]
pub struct ChartPaths {
    pub scatter: PathBuf,
    pub roles: PathBuf,
    pub lanes: PathBuf,
}

/// Linear mapping from data space into the plot area.
struct Canvas {
    img: RgbImage,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Canvas {
    fn new(x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            img: RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND),
            x_range,
            y_range,
        }
    }

    fn px(&self, x: f64) -> i64 {
        let (lo, hi) = self.x_range;
        let span = (WIDTH - 2 * MARGIN) as f64;
        MARGIN as i64 + ((x - lo) / (hi - lo) * span).round() as i64
    }

    fn py(&self, y: f64) -> i64 {
        let (lo, hi) = self.y_range;
        let span = (HEIGHT - 2 * MARGIN) as f64;
        (HEIGHT - MARGIN) as i64 - ((y - lo) / (hi - lo) * span).round() as i64
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < WIDTH && (y as u32) < HEIGHT {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    fn line(&mut self, (mut x0, mut y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn fill_rect(&mut self, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
        for x in x0.min(x1)..=x0.max(x1) {
            for y in y0.min(y1)..=y0.max(y1) {
                self.put(x, y, color);
            }
        }
    }

    fn disc(&mut self, (cx, cy): (i64, i64), r: i64, color: Rgb<u8>) {
        for dx in -r..=r {
            for dy in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Axes plus horizontal and vertical grid lines at `ticks` steps.
    fn frame(&mut self, ticks: u32) {
        let left = MARGIN as i64;
        let right = (WIDTH - MARGIN) as i64;
        let top = MARGIN as i64;
        let bottom = (HEIGHT - MARGIN) as i64;

        for i in 1..=ticks as i64 {
            let gx = left + (right - left) * i / ticks as i64;
            let gy = bottom - (bottom - top) * i / ticks as i64;
            self.line((gx, top), (gx, bottom), GRID);
            self.line((left, gy), (right, gy), GRID);
        }
        self.line((left, bottom), (right, bottom), AXIS);
        self.line((left, top), (left, bottom), AXIS);
    }
}

fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - pad.max(1.0), hi + pad.max(1.0));
    }
    (lo - pad, hi + pad)
}

fn group_color(keys: &[String], key: &str) -> Rgb<u8> {
    let idx = keys.iter().position(|k| k == key).unwrap_or(0);
    PALETTE[idx % PALETTE.len()]
}

/// Ban rate % (x) against win rate % (y), one disc per hero, coloured by
/// primary role and sized by win rate.
pub fn ban_vs_win_scatter(obs: &[HeroObservation]) -> RgbImage {
    let roles: Vec<String> = obs
        .iter()
        .map(|o| o.primary_role.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let x_range = padded_range(obs.iter().map(|o| o.ban_rate_pct).chain([0.0]), 1.0);
    let y_range = padded_range(obs.iter().map(|o| o.win_rate_pct), 1.0);
    let mut canvas = Canvas::new(x_range, y_range);
    canvas.frame(10);

    let (y_lo, y_hi) = y_range;
    for o in obs {
        let scale = (o.win_rate_pct - y_lo) / (y_hi - y_lo);
        let radius = 3 + (scale * 5.0).round() as i64;
        let center = (canvas.px(o.ban_rate_pct), canvas.py(o.win_rate_pct));
        canvas.disc(center, radius, group_color(&roles, &o.primary_role));
    }

    // legend swatches, one per role, top right
    for (i, role) in roles.iter().enumerate() {
        let x = (WIDTH - MARGIN + 10) as i64;
        let y = MARGIN as i64 + i as i64 * 16;
        canvas.fill_rect((x, y), (x + 10, y + 10), group_color(&roles, role));
    }

    canvas.img
}

/// Win-rate spread per group: whiskers min..max, box q1..q3, median line
/// and a red marker at the group mean.
pub fn group_box_plot(dists: &[GroupDistribution], means: &[GroupAverage]) -> RgbImage {
    let y_range = padded_range(dists.iter().flat_map(|d| [d.min, d.max]), 1.0);
    let slots = dists.len().max(1) as f64;
    let mut canvas = Canvas::new((0.0, slots), y_range);
    canvas.frame(dists.len().max(1) as u32);

    let keys: Vec<String> = dists.iter().map(|d| d.key.clone()).collect();
    let half_width = ((WIDTH - 2 * MARGIN) as f64 / slots / 4.0) as i64;

    for (i, d) in dists.iter().enumerate() {
        let cx = canvas.px(i as f64 + 0.5);
        let color = group_color(&keys, &d.key);

        canvas.line((cx, canvas.py(d.min)), (cx, canvas.py(d.max)), AXIS);
        canvas.line((cx - half_width / 2, canvas.py(d.min)), (cx + half_width / 2, canvas.py(d.min)), AXIS);
        canvas.line((cx - half_width / 2, canvas.py(d.max)), (cx + half_width / 2, canvas.py(d.max)), AXIS);
        canvas.fill_rect((cx - half_width, canvas.py(d.q1)), (cx + half_width, canvas.py(d.q3)), color);
        canvas.line((cx - half_width, canvas.py(d.median)), (cx + half_width, canvas.py(d.median)), AXIS);

        if let Some(mean) = means.iter().find(|g| g.key == d.key) {
            canvas.disc((cx, canvas.py(mean.win_rate_pct)), 4, MEAN_MARKER);
        }
    }

    canvas.img
}

/// Render the charts for the latest extraction date into `dir`. Files are
/// stamped with that date: `{YYYYMMDD}_ban_vs_win_rate.png`,
/// `{YYYYMMDD}_win_rate_by_role.png` and `{YYYYMMDD}_win_rate_by_lane.png`.
pub fn generate_charts(obs: &[HeroObservation], dir: &Path) -> Result<ChartPaths> {
    let Some(date) = latest_date(obs) else {
        return Err(AppError::NotFound("no usable historical rows to chart".to_string()));
    };
    let current = latest(obs);
    fs::create_dir_all(dir)?;
    let stamp = date.format("%Y%m%d");

    let scatter = dir.join(format!("{stamp}_ban_vs_win_rate.png"));
    ban_vs_win_scatter(&current).save(&scatter)?;

    let roles = dir.join(format!("{stamp}_win_rate_by_role.png"));
    group_box_plot(&role_distributions(&current), &mean_by_role(&current)).save(&roles)?;

    let lanes = dir.join(format!("{stamp}_win_rate_by_lane.png"));
    group_box_plot(&lane_distributions(&current), &mean_by_lane(&current)).save(&lanes)?;

    info!(
        "Charts written to {}, {} and {}",
        scatter.display(),
        roles.display(),
        lanes.display()
    );
    Ok(ChartPaths { scatter, roles, lanes })
}
