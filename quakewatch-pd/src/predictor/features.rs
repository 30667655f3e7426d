//! Feature Aggregator
//!
//! Narrows the historical catalog per the active aggregation policy,
//! reduces the selected events to per-cell aggregates, and assembles the
//! ordered feature vector the model's schema requires. An empty subset
//! always falls back to catalog-wide means; NaN never reaches the model.

use chrono::Duration;

use crate::catalog::{mean_field, within_square, CatalogStats, Event, EventCatalog, EventField};
use crate::config::{AggregationPolicy, AggregationSettings, ScoringSettings};
use crate::error::{Error, Result};
use crate::predictor::grid::GridCell;
use quakewatch_common::RequestContext;

/// Feature names the aggregator can supply, in no particular order.
///
/// A model schema may request any subset of these; the schema's own order
/// defines the vector layout.
pub const KNOWN_FEATURES: &[&str] = &[
    "latitude",
    "longitude",
    "depth",
    "magnitude",
    "station_count",
    "gap",
    "closeness",
    "rms",
    "significance",
    "day_of_week",
    "hour_of_day",
];

pub fn is_known_feature(name: &str) -> bool {
    KNOWN_FEATURES.contains(&name)
}

/// Aggregates for one grid cell, reduced from the selected event subset
/// (or catalog-wide means when the subset was empty).
#[derive(Debug, Clone, PartialEq)]
pub struct CellAggregates {
    pub depth: f64,
    pub magnitude: f64,
    pub station_count: f64,
    pub gap: f64,
    pub closeness: f64,
    pub rms: f64,
    pub significance: f64,
    /// Maximum magnitude in the local subset, absent without local data
    pub local_max_magnitude: Option<f64>,
    /// Any nonzero tsunami flag in the local subset; tracked only by the
    /// trailing-window policy
    pub tsunami_risk: Option<bool>,
    pub has_local_data: bool,
}

impl CellAggregates {
    /// Apply the harmonic feature warp: depth scales with the hour factor,
    /// magnitude with the day factor.
    pub fn time_warped(mut self, scoring: &ScoringSettings, ctx: &RequestContext) -> Self {
        if scoring.time_warped_features {
            self.depth *= 1.0 + scoring.depth_hour_gain * ctx.hour_factor;
            self.magnitude *= 1.0 + scoring.magnitude_day_gain * ctx.day_factor;
        }
        self
    }
}

/// Per-request aggregation plan.
///
/// The spatial policies keep an event pool and scan the square neighborhood
/// per cell; the hour-window and exact-date policies are spatially flat, so
/// their aggregates are computed once and shared by every cell.
pub struct AggregationPlan<'a> {
    radius: f64,
    stats: &'a CatalogStats,
    scope: Scope<'a>,
}

enum Scope<'a> {
    PerCell {
        pool: Vec<&'a Event>,
        track_tsunami: bool,
    },
    Flat {
        aggregates: CellAggregates,
    },
}

impl<'a> AggregationPlan<'a> {
    pub fn prepare(
        catalog: &'a EventCatalog,
        settings: &AggregationSettings,
        ctx: &RequestContext,
    ) -> Self {
        let stats = catalog.stats();
        let scope = match settings.policy {
            AggregationPolicy::SpatialRadius => Scope::PerCell {
                pool: catalog.events().iter().collect(),
                track_tsunami: false,
            },
            AggregationPolicy::RecentWindow => {
                let start = ctx.timestamp - Duration::days(settings.window_days);
                Scope::PerCell {
                    pool: catalog.events_between(start, ctx.timestamp),
                    track_tsunami: true,
                }
            }
            AggregationPolicy::HourWindow => {
                let subset = catalog.events_in_hour_window(ctx.hour_of_day, settings.hour_window);
                Scope::Flat {
                    aggregates: aggregate_events(&subset, stats, false),
                }
            }
            AggregationPolicy::ExactDate => {
                let subset = catalog.events_on_date(ctx.timestamp.date());
                Scope::Flat {
                    aggregates: aggregate_events(&subset, stats, false),
                }
            }
        };
        Self {
            radius: settings.radius,
            stats,
            scope,
        }
    }

    /// Aggregates for one cell
    pub fn cell_aggregates(&self, cell: &GridCell) -> CellAggregates {
        match &self.scope {
            Scope::PerCell {
                pool,
                track_tsunami,
            } => {
                let local = within_square(pool, cell.lat, cell.lon, self.radius);
                aggregate_events(&local, self.stats, *track_tsunami)
            }
            Scope::Flat { aggregates } => aggregates.clone(),
        }
    }
}

/// Reduce an event subset to aggregates, falling back to catalog-wide means
/// per field when the subset has no values for it.
fn aggregate_events(
    events: &[&Event],
    stats: &CatalogStats,
    track_tsunami: bool,
) -> CellAggregates {
    let has_local = !events.is_empty();
    let mean_or_global =
        |field: EventField| mean_field(events.iter().copied(), field).unwrap_or(stats.mean(field));

    CellAggregates {
        depth: mean_or_global(EventField::Depth),
        magnitude: mean_or_global(EventField::Magnitude),
        station_count: mean_or_global(EventField::StationCount),
        gap: mean_or_global(EventField::Gap),
        closeness: mean_or_global(EventField::Closeness),
        rms: mean_or_global(EventField::Rms),
        significance: mean_or_global(EventField::Significance),
        local_max_magnitude: has_local.then(|| {
            events
                .iter()
                .map(|e| e.magnitude)
                .fold(f64::NEG_INFINITY, f64::max)
        }),
        tsunami_risk: track_tsunami
            .then(|| events.iter().any(|e| e.tsunami.map_or(false, |t| t != 0.0))),
        has_local_data: has_local,
    }
}

/// Assemble the ordered feature vector for one cell per the model schema.
///
/// Fails with a schema mismatch on any name the aggregator cannot supply;
/// the same check runs once at startup, so a per-request failure means the
/// model changed underneath the service.
pub fn feature_vector(
    schema: &[String],
    cell: &GridCell,
    aggregates: &CellAggregates,
    ctx: &RequestContext,
) -> Result<Vec<f64>> {
    schema
        .iter()
        .map(|name| match name.as_str() {
            "latitude" => Ok(cell.lat),
            "longitude" => Ok(cell.lon),
            "depth" => Ok(aggregates.depth),
            "magnitude" => Ok(aggregates.magnitude),
            "station_count" => Ok(aggregates.station_count),
            "gap" => Ok(aggregates.gap),
            "closeness" => Ok(aggregates.closeness),
            "rms" => Ok(aggregates.rms),
            "significance" => Ok(aggregates.significance),
            "day_of_week" => Ok(ctx.day_of_week as f64),
            "hour_of_day" => Ok(ctx.hour_of_day as f64),
            other => Err(Error::SchemaMismatch(format!(
                "model requires unknown feature '{}'",
                other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForecastProfile, ForecastSettings};
    use chrono::NaiveDateTime;

    fn event(lat: f64, lon: f64, mag: f64, ts: &str) -> Event {
        Event {
            latitude: lat,
            longitude: lon,
            depth: 10.0,
            magnitude: mag,
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
            station_count: None,
            gap: None,
            closeness: None,
            rms: None,
            significance: None,
            tsunami: None,
        }
    }

    fn ctx(date: &str, time: &str) -> RequestContext {
        RequestContext::parse(date, time).unwrap()
    }

    #[test]
    fn test_spatial_radius_uses_local_means() {
        let mut near = event(34.1, -118.1, 5.0, "2024-01-01 00:00:00");
        near.depth = 20.0;
        let mut far = event(40.0, -110.0, 2.0, "2024-01-01 00:00:00");
        far.depth = 4.0;
        let catalog = EventCatalog::from_events(vec![near, far]).unwrap();
        let settings = ForecastSettings::for_profile(ForecastProfile::Baseline).aggregation;

        let context = ctx("2024-03-15", "14:30:00");
        let plan = AggregationPlan::prepare(&catalog, &settings, &context);
        let aggregates = plan.cell_aggregates(&GridCell {
            lat: 34.0,
            lon: -118.0,
        });

        assert!(aggregates.has_local_data);
        assert_eq!(aggregates.depth, 20.0);
        assert_eq!(aggregates.magnitude, 5.0);
        assert_eq!(aggregates.local_max_magnitude, Some(5.0));
        assert_eq!(aggregates.tsunami_risk, None);
    }

    #[test]
    fn test_empty_neighborhood_falls_back_to_global_means() {
        let catalog = EventCatalog::from_events(vec![
            event(40.0, -110.0, 2.0, "2024-01-01 00:00:00"),
            event(41.0, -111.0, 4.0, "2024-01-01 00:00:00"),
        ])
        .unwrap();
        let settings = ForecastSettings::for_profile(ForecastProfile::Baseline).aggregation;

        let context = ctx("2024-03-15", "14:30:00");
        let plan = AggregationPlan::prepare(&catalog, &settings, &context);
        let aggregates = plan.cell_aggregates(&GridCell {
            lat: 0.0,
            lon: 0.0,
        });

        assert!(!aggregates.has_local_data);
        assert_eq!(aggregates.magnitude, 3.0);
        assert_eq!(aggregates.local_max_magnitude, None);
        assert!(!aggregates.depth.is_nan());
        assert!(!aggregates.rms.is_nan());
    }

    #[test]
    fn test_recent_window_excludes_old_events() {
        let mut old = event(34.0, -118.0, 6.0, "2023-01-01 00:00:00");
        old.tsunami = Some(1.0);
        let recent = event(34.0, -118.0, 3.0, "2024-03-10 00:00:00");
        let catalog = EventCatalog::from_events(vec![old, recent]).unwrap();
        let settings = ForecastSettings::for_profile(ForecastProfile::RecentActivity).aggregation;

        let context = ctx("2024-03-15", "14:30:00");
        let plan = AggregationPlan::prepare(&catalog, &settings, &context);
        let aggregates = plan.cell_aggregates(&GridCell {
            lat: 34.0,
            lon: -118.0,
        });

        // Only the event inside the 30-day window is aggregated
        assert_eq!(aggregates.magnitude, 3.0);
        assert_eq!(aggregates.local_max_magnitude, Some(3.0));
        assert_eq!(aggregates.tsunami_risk, Some(false));
    }

    #[test]
    fn test_recent_window_flags_tsunami() {
        let mut wave = event(34.0, -118.0, 6.0, "2024-03-10 00:00:00");
        wave.tsunami = Some(1.0);
        let catalog = EventCatalog::from_events(vec![wave]).unwrap();
        let settings = ForecastSettings::for_profile(ForecastProfile::RecentActivity).aggregation;

        let context = ctx("2024-03-15", "14:30:00");
        let plan = AggregationPlan::prepare(&catalog, &settings, &context);
        let aggregates = plan.cell_aggregates(&GridCell {
            lat: 34.0,
            lon: -118.0,
        });
        assert_eq!(aggregates.tsunami_risk, Some(true));
    }

    #[test]
    fn test_hour_window_is_spatially_flat() {
        let in_window = event(34.0, -118.0, 6.0, "2024-01-01 14:00:00");
        let out_of_window = event(34.0, -118.0, 2.0, "2024-01-01 02:00:00");
        let catalog = EventCatalog::from_events(vec![in_window, out_of_window]).unwrap();
        let settings = ForecastSettings::for_profile(ForecastProfile::Harmonic).aggregation;

        let context = ctx("2024-03-15", "14:30:00");
        let plan = AggregationPlan::prepare(&catalog, &settings, &context);

        // Same aggregates regardless of cell position
        let here = plan.cell_aggregates(&GridCell {
            lat: 34.0,
            lon: -118.0,
        });
        let elsewhere = plan.cell_aggregates(&GridCell {
            lat: 0.0,
            lon: 0.0,
        });
        assert_eq!(here, elsewhere);
        assert_eq!(here.magnitude, 6.0);
    }

    #[test]
    fn test_exact_date_filters_by_calendar_date() {
        let match_day = event(34.0, -118.0, 5.0, "2024-03-15 04:00:00");
        let other_day = event(34.0, -118.0, 1.0, "2024-03-16 04:00:00");
        let catalog = EventCatalog::from_events(vec![match_day, other_day]).unwrap();
        let settings = ForecastSettings::for_profile(ForecastProfile::DailySnapshot).aggregation;

        let context = ctx("2024-03-15", "14:30:00");
        let plan = AggregationPlan::prepare(&catalog, &settings, &context);
        let aggregates = plan.cell_aggregates(&GridCell {
            lat: 34.0,
            lon: -118.0,
        });
        assert_eq!(aggregates.magnitude, 5.0);
    }

    #[test]
    fn test_time_warp_scales_depth_and_magnitude() {
        let scoring = ForecastSettings::for_profile(ForecastProfile::Harmonic).scoring;
        // 06:00 Monday: hour_factor = 1, day_factor = 0
        let context = ctx("2024-03-11", "06:00:00");
        let aggregates = CellAggregates {
            depth: 10.0,
            magnitude: 4.0,
            station_count: 0.0,
            gap: 0.0,
            closeness: 0.0,
            rms: 0.0,
            significance: 0.0,
            local_max_magnitude: None,
            tsunami_risk: None,
            has_local_data: false,
        };

        let warped = aggregates.clone().time_warped(&scoring, &context);
        assert!((warped.depth - 12.0).abs() < 1e-9);
        assert!((warped.magnitude - 4.0).abs() < 1e-9);

        // Warp disabled leaves values untouched
        let plain = ForecastSettings::for_profile(ForecastProfile::Baseline).scoring;
        assert_eq!(aggregates.clone().time_warped(&plain, &context), aggregates);
    }

    #[test]
    fn test_feature_vector_follows_schema_order() {
        let aggregates = CellAggregates {
            depth: 12.0,
            magnitude: 4.5,
            station_count: 20.0,
            gap: 110.0,
            closeness: 0.3,
            rms: 0.2,
            significance: 600.0,
            local_max_magnitude: None,
            tsunami_risk: None,
            has_local_data: false,
        };
        let context = ctx("2024-03-15", "14:30:00");
        let cell = GridCell {
            lat: 34.0,
            lon: -118.0,
        };

        let schema: Vec<String> = ["magnitude", "latitude", "hour_of_day"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vector = feature_vector(&schema, &cell, &aggregates, &context).unwrap();
        assert_eq!(vector, vec![4.5, 34.0, 14.0]);
    }

    #[test]
    fn test_feature_vector_rejects_unknown_name() {
        let aggregates = CellAggregates {
            depth: 0.0,
            magnitude: 0.0,
            station_count: 0.0,
            gap: 0.0,
            closeness: 0.0,
            rms: 0.0,
            significance: 0.0,
            local_max_magnitude: None,
            tsunami_risk: None,
            has_local_data: false,
        };
        let context = ctx("2024-03-15", "14:30:00");
        let cell = GridCell { lat: 0.0, lon: 0.0 };

        let schema = vec!["color".to_string()];
        assert!(matches!(
            feature_vector(&schema, &cell, &aggregates, &context),
            Err(Error::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_known_features_cover_schema_names() {
        for name in KNOWN_FEATURES {
            assert!(is_known_feature(name));
        }
        assert!(!is_known_feature("color"));
    }
}
