//! Grid Builder
//!
//! Derives the lattice of candidate (lat, lon) sample points for one
//! request, either spanning the catalog bounding box or centered on the
//! catalog mean with a time-modulated spread.

use crate::catalog::CatalogStats;
use crate::config::{GridPolicy, GridSettings, SpreadRule};
use quakewatch_common::RequestContext;

/// One candidate sample point under evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub lat: f64,
    pub lon: f64,
}

/// Per-axis resolution for one request.
///
/// Hour-scaled sizing truncates toward zero (`n = size + gain·|hf|`),
/// floor-capped at 1 and ceiling-capped by `max_size`.
pub fn resolution(settings: &GridSettings, ctx: &RequestContext) -> usize {
    let n = if settings.hour_scaled {
        (settings.size as f64 + settings.size_gain * ctx.hour_factor.abs()).trunc() as usize
    } else {
        settings.size
    };
    n.clamp(1, settings.max_size.max(1))
}

/// Build the `n × n` lattice for one request, latitude outer, longitude
/// inner.
pub fn build_grid(
    settings: &GridSettings,
    stats: &CatalogStats,
    ctx: &RequestContext,
) -> Vec<GridCell> {
    let n = resolution(settings, ctx);

    let (lat_lo, lat_hi, lon_lo, lon_hi) = match settings.policy {
        GridPolicy::StaticBounds => (stats.lat_min, stats.lat_max, stats.lon_min, stats.lon_max),
        GridPolicy::DynamicCentered => {
            let spread = match settings.spread_rule {
                SpreadRule::AbsDay => settings.spread_base + ctx.day_factor.abs(),
                SpreadRule::HalfDay => settings.spread_base + 0.5 * ctx.day_factor,
            };
            (
                stats.lat_mean - spread,
                stats.lat_mean + spread,
                stats.lon_mean - spread,
                stats.lon_mean + spread,
            )
        }
    };

    let lats = linspace(lat_lo, lat_hi, n);
    let lons = linspace(lon_lo, lon_hi, n);

    let mut cells = Vec::with_capacity(n * n);
    for &lat in &lats {
        for &lon in &lons {
            cells.push(GridCell { lat, lon });
        }
    }
    cells
}

/// `n` evenly spaced values from `start` to `end`, endpoints included.
///
/// Equal endpoints are valid and yield `n` repeated values; no division by
/// zero occurs.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}
