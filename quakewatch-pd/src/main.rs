//! Prediction Daemon (quakewatch-pd) - Main entry point
//!
//! Loads the trained classifier and the historical event catalog once at
//! startup, then serves grid forecasts over HTTP. A failed load degrades
//! the service instead of crashing: the process stays up and every predict
//! request reports the missing collaborator.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quakewatch_common::config::{resolve_data_folder, TomlConfig};
use quakewatch_pd::api::{self, AppState};
use quakewatch_pd::catalog::EventCatalog;
use quakewatch_pd::config::{ForecastProfile, ForecastSettings};
use quakewatch_pd::model::GradientBoostedModel;
use quakewatch_pd::predictor::Forecaster;

const DEFAULT_PORT: u16 = 5820;
const DEFAULT_MODEL_FILE: &str = "model.json";
const DEFAULT_CATALOG_FILE: &str = "catalog.csv";

/// Command-line arguments for quakewatch-pd
#[derive(Parser, Debug)]
#[command(name = "quakewatch-pd")]
#[command(about = "Seismic activity prediction daemon for QuakeWatch")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "QUAKEWATCH_PD_PORT")]
    port: Option<u16>,

    /// Folder containing the model and catalog files
    #[arg(short, long, env = "QUAKEWATCH_DATA")]
    data_folder: Option<String>,

    /// Model artifact file name, relative to the data folder
    #[arg(long, env = "QUAKEWATCH_MODEL_FILE")]
    model_file: Option<String>,

    /// Catalog CSV file name, relative to the data folder
    #[arg(long, env = "QUAKEWATCH_CATALOG_FILE")]
    catalog_file: Option<String>,

    /// Forecast profile: baseline, recent-activity, harmonic, daily-snapshot
    #[arg(long, env = "QUAKEWATCH_PROFILE")]
    profile: Option<String>,

    /// Explicit configuration file path
    #[arg(short, long, env = "QUAKEWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quakewatch_pd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let toml_config = match &args.config {
        Some(path) => TomlConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => TomlConfig::load_default_locations(),
    };

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

    let profile_name = args
        .profile
        .clone()
        .or_else(|| toml_config.profile.clone());
    let profile = match profile_name {
        Some(name) => ForecastProfile::from_str(&name).with_context(|| {
            let known: Vec<&str> = ForecastProfile::all_variants()
                .iter()
                .map(|p| p.as_str())
                .collect();
            format!(
                "Unknown forecast profile '{}'; expected one of: {}",
                name,
                known.join(", ")
            )
        })?,
        None => ForecastProfile::default(),
    };
    let settings = ForecastSettings::for_profile(profile).with_overrides(&toml_config);

    let data_folder = resolve_data_folder(
        args.data_folder.as_deref(),
        "QUAKEWATCH_DATA",
        &toml_config,
    );
    let model_path = data_folder.join(
        args.model_file
            .clone()
            .or_else(|| toml_config.model_file.clone())
            .unwrap_or_else(|| DEFAULT_MODEL_FILE.to_string()),
    );
    let catalog_path = data_folder.join(
        args.catalog_file
            .clone()
            .or_else(|| toml_config.catalog_file.clone())
            .unwrap_or_else(|| DEFAULT_CATALOG_FILE.to_string()),
    );

    info!("Starting QuakeWatch Prediction Daemon on port {}", port);
    info!("Forecast profile: {}", profile);
    info!("Data folder: {}", data_folder.display());

    // Load collaborators; failure degrades the service instead of aborting
    let (forecaster, degraded_reason) = match load_forecaster(&model_path, &catalog_path, settings)
    {
        Ok(forecaster) => (Some(Arc::new(forecaster)), None),
        Err(e) => {
            warn!(
                "Starting degraded, predict requests will fail: {:#}",
                e
            );
            (None, Some(format!("{:#}", e)))
        }
    };

    let state = AppState {
        forecaster,
        profile,
        degraded_reason,
        port,
    };
    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Load the model and catalog and wire the pipeline
fn load_forecaster(
    model_path: &std::path::Path,
    catalog_path: &std::path::Path,
    settings: ForecastSettings,
) -> Result<Forecaster> {
    let model = GradientBoostedModel::load(model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;
    info!(
        "Model loaded: {} trees over {} features",
        model.trees.len(),
        model.feature_names().len()
    );

    let catalog = EventCatalog::load(catalog_path)
        .with_context(|| format!("Failed to load catalog from {}", catalog_path.display()))?;
    info!(
        "Catalog loaded: {} events from {} to {}",
        catalog.len(),
        catalog.stats().first_timestamp,
        catalog.stats().last_timestamp
    );

    Forecaster::new(Arc::new(model), Arc::new(catalog), settings)
        .context("Model feature schema is incompatible with the aggregator")
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
