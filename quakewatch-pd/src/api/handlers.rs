//! HTTP request handlers
//!
//! All request-time failures are reported as HTTP 500 with a structured
//! `{"status": "error", "message": ...}` body; no partial results are
//! returned.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{error, info};

use crate::api::AppState;
use crate::error::Error;
use quakewatch_common::api::{ErrorBody, ForecastResponse, PredictRequest};
use quakewatch_common::RequestContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    profile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    degraded_reason: Option<String>,
}

/// GET /health - Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let degraded = state.forecaster.is_none();
    Json(HealthResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        module: "quakewatch-pd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        profile: state.profile.to_string(),
        degraded_reason: state.degraded_reason.clone(),
    })
}

/// POST /predict - Run the forecast pipeline for a requested timestamp
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<ForecastResponse>, (StatusCode, Json<ErrorBody>)> {
    let forecaster = state.forecaster.as_ref().ok_or_else(|| {
        let reason = state
            .degraded_reason
            .clone()
            .unwrap_or_else(|| "model or catalog not loaded".to_string());
        error!("Predict request while degraded: {}", reason);
        internal_error(Error::MissingCollaborator(reason))
    })?;

    let ctx = RequestContext::parse(&request.date, &request.time)
        .map_err(|e| internal_error(e.into()))?;

    let forecast = forecaster.forecast(&ctx).map_err(internal_error)?;

    info!(
        timestamp = %ctx.timestamp_string(),
        predictions = forecast.predictions.len(),
        "forecast served"
    );
    Ok(Json(forecast.into_response()))
}

fn internal_error(error: Error) -> (StatusCode, Json<ErrorBody>) {
    error!("Request failed: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(error.to_string())),
    )
}
