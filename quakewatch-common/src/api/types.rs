//! Shared API request/response types
//!
//! The wire contract of the prediction endpoint: request body, per-cell
//! prediction records, and the optional historical/metadata blocks whose
//! presence depends on the active forecast profile.

use serde::{Deserialize, Serialize};

// ========================================
// Request Types
// ========================================

/// Body of `POST /predict`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictRequest {
    /// Target date, `YYYY-MM-DD`
    pub date: String,
    /// Target time of day, `HH:MM:SS`
    pub time: String,
}

// ========================================
// Response Types
// ========================================

/// One retained grid cell
///
/// The optional fields are populated only by profiles whose aggregation
/// tracks them (cell-level depth/significance and tsunami risk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub lat: f64,
    pub lon: f64,
    /// Adjusted classifier probability, strictly above the decision threshold
    pub probability: f64,
    /// Estimated magnitude for the retained cell
    pub magnitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsunami_risk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<f64>,
}

/// Column-oriented slice of the historical catalog included in a response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalSlice {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub magnitude: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsunami: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<Vec<f64>>,
    /// Event timestamps, `YYYY-MM-DD HH:MM:SS`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<String>>,
}

/// Profile-dependent response metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_events: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_magnitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_magnitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsunami_events: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_count: Option<usize>,
}

/// Successful response of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    /// Always `"success"`
    pub status: String,
    pub predictions: Vec<Prediction>,
    /// Echo of the resolved target timestamp, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical: Option<HistoricalSlice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ForecastMetadata>,
}

/// Error response body, returned with HTTP 500
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always `"error"`
    pub status: String,
    /// Human-readable description
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}
