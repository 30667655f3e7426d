//! Forecast pipeline
//!
//! One request flows through: grid building, per-cell feature aggregation,
//! scoring, significance filtering, and response assembly. The pipeline is
//! stateless across requests; the catalog and model are shared read-only.

pub mod features;
pub mod grid;
pub mod scorer;
pub mod significance;

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::catalog::EventCatalog;
use crate::config::{ForecastSettings, HistoricalDetail, MetadataDetail};
use crate::error::{Error, Result};
use crate::model::GradientBoostedModel;
use features::{feature_vector, is_known_feature, AggregationPlan};
use grid::build_grid;
use quakewatch_common::api::{ForecastMetadata, ForecastResponse, HistoricalSlice, Prediction};
use quakewatch_common::time::TIMESTAMP_FORMAT;
use quakewatch_common::RequestContext;

/// Result of one forecast request, before serialization
#[derive(Debug, Clone)]
pub struct Forecast {
    pub predictions: Vec<Prediction>,
    pub historical: Option<HistoricalSlice>,
    pub metadata: Option<ForecastMetadata>,
    pub timestamp: NaiveDateTime,
}

impl Forecast {
    /// Shape the forecast into the wire response
    pub fn into_response(self) -> ForecastResponse {
        ForecastResponse {
            status: "success".to_string(),
            predictions: self.predictions,
            timestamp: self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            historical: self.historical,
            metadata: self.metadata,
        }
    }
}

/// The prediction pipeline: catalog + model + profile settings.
///
/// Constructed once at startup; the feature-schema contract between the
/// model and the aggregator is validated here, not rediscovered per
/// request.
pub struct Forecaster {
    model: Arc<GradientBoostedModel>,
    catalog: Arc<EventCatalog>,
    settings: ForecastSettings,
}

impl Forecaster {
    pub fn new(
        model: Arc<GradientBoostedModel>,
        catalog: Arc<EventCatalog>,
        settings: ForecastSettings,
    ) -> Result<Self> {
        let unknown: Vec<&str> = model
            .feature_names()
            .iter()
            .map(|s| s.as_str())
            .filter(|name| !is_known_feature(name))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::SchemaMismatch(format!(
                "model requires features the aggregator cannot supply: {}",
                unknown.join(", ")
            )));
        }
        Ok(Self {
            model,
            catalog,
            settings,
        })
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Run the full pipeline for one resolved request context.
    pub fn forecast(&self, ctx: &RequestContext) -> Result<Forecast> {
        let cells = build_grid(&self.settings.grid, self.catalog.stats(), ctx);
        let plan = AggregationPlan::prepare(&self.catalog, &self.settings.aggregation, ctx);

        let mut predictions = Vec::new();
        for cell in &cells {
            let aggregates = plan
                .cell_aggregates(cell)
                .time_warped(&self.settings.scoring, ctx);
            let features = feature_vector(self.model.feature_names(), cell, &aggregates, ctx)?;
            let probability = scorer::score(&self.model, &features, &self.settings.scoring, ctx)?;

            if !significance::is_significant(probability, self.settings.significance.threshold) {
                continue;
            }

            let magnitude = significance::estimate_magnitude(
                self.settings.significance.magnitude_rule,
                &aggregates,
                probability,
            );
            let details = self.settings.response.cell_details;
            predictions.push(Prediction {
                lat: cell.lat,
                lon: cell.lon,
                probability,
                magnitude,
                depth: details.then_some(aggregates.depth),
                tsunami_risk: if details { aggregates.tsunami_risk } else { None },
                significance: details.then_some(aggregates.significance),
            });
        }

        debug!(
            cells = cells.len(),
            retained = predictions.len(),
            profile = %self.settings.profile,
            "forecast complete"
        );

        let historical = self.historical_slice(ctx);
        let metadata = self.metadata(ctx, predictions.len());

        Ok(Forecast {
            predictions,
            historical,
            metadata,
            timestamp: ctx.timestamp,
        })
    }

    fn historical_slice(&self, ctx: &RequestContext) -> Option<HistoricalSlice> {
        match self.settings.response.historical {
            HistoricalDetail::None => None,
            HistoricalDetail::FullCatalog => {
                let events = self.catalog.events();
                Some(HistoricalSlice {
                    lat: events.iter().map(|e| e.latitude).collect(),
                    lon: events.iter().map(|e| e.longitude).collect(),
                    magnitude: events.iter().map(|e| e.magnitude).collect(),
                    ..Default::default()
                })
            }
            HistoricalDetail::TrailingWindow => {
                let window = self.trailing_window(ctx);
                Some(HistoricalSlice {
                    lat: window.iter().map(|e| e.latitude).collect(),
                    lon: window.iter().map(|e| e.longitude).collect(),
                    magnitude: window.iter().map(|e| e.magnitude).collect(),
                    depth: Some(window.iter().map(|e| e.depth).collect()),
                    tsunami: Some(
                        window
                            .iter()
                            .map(|e| e.tsunami.unwrap_or(0.0))
                            .collect(),
                    ),
                    significance: Some(
                        window
                            .iter()
                            .map(|e| e.significance.unwrap_or(0.0))
                            .collect(),
                    ),
                    dates: Some(
                        window
                            .iter()
                            .map(|e| e.timestamp.format(TIMESTAMP_FORMAT).to_string())
                            .collect(),
                    ),
                })
            }
        }
    }

    fn metadata(&self, ctx: &RequestContext, prediction_count: usize) -> Option<ForecastMetadata> {
        match self.settings.response.metadata {
            MetadataDetail::None => None,
            MetadataDetail::WindowSummary => {
                let window = self.trailing_window(ctx);
                let count = window.len();
                let avg = if count > 0 {
                    window.iter().map(|e| e.magnitude).sum::<f64>() / count as f64
                } else {
                    0.0
                };
                let max = window
                    .iter()
                    .map(|e| e.magnitude)
                    .fold(f64::NEG_INFINITY, f64::max);
                Some(ForecastMetadata {
                    total_events: Some(count),
                    avg_magnitude: Some(avg),
                    max_magnitude: Some(if count > 0 { max } else { 0.0 }),
                    tsunami_events: Some(
                        window
                            .iter()
                            .filter(|e| e.tsunami.map_or(false, |t| t != 0.0))
                            .count(),
                    ),
                    ..Default::default()
                })
            }
            MetadataDetail::HarmonicFactors => Some(ForecastMetadata {
                hour_factor: Some(ctx.hour_factor),
                day_factor: Some(ctx.day_factor),
                prediction_count: Some(prediction_count),
                ..Default::default()
            }),
            MetadataDetail::CalendarFactors => Some(ForecastMetadata {
                hour: Some(ctx.hour_of_day),
                hour_factor: Some(ctx.hour_factor),
                day_of_week: Some(ctx.day_of_week),
                day_factor: Some(ctx.day_factor),
                prediction_count: Some(prediction_count),
                ..Default::default()
            }),
        }
    }

    fn trailing_window(&self, ctx: &RequestContext) -> Vec<&crate::catalog::Event> {
        let start = ctx.timestamp - Duration::days(self.settings.response.historical_window_days);
        self.catalog.events_between(start, ctx.timestamp)
    }
}
