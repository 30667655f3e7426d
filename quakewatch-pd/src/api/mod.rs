//! HTTP API for the prediction daemon
//!
//! One prediction endpoint plus a health check. CORS is permissive for
//! local dashboard access.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ForecastProfile;
use crate::predictor::Forecaster;

/// Application state shared across handlers.
///
/// `forecaster` is `None` when a collaborator failed to load at startup:
/// the service stays up in a degraded state and every predict request
/// reports the failure.
#[derive(Clone)]
pub struct AppState {
    pub forecaster: Option<Arc<Forecaster>>,
    pub profile: ForecastProfile,
    /// Startup failure description when degraded
    pub degraded_reason: Option<String>,
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .with_state(state)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}
