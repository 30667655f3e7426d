//! Error types for quakewatch-pd
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. All request-time failures surface at the endpoint boundary
//! as a structured 500 response.

use thiserror::Error;

/// Main error type for the quakewatch-pd module
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog CSV parsing errors
    #[error("Catalog error: {0}")]
    Csv(#[from] csv::Error),

    /// Model artifact parsing errors
    #[error("Model artifact error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unparsable date/time in a prediction request
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// A collaborator (model or catalog) failed to load at startup;
    /// requests fail with this until the service is restarted
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    /// Model feature schema names a feature the aggregator cannot supply
    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Unexpected failure during aggregation or scoring
    #[error("Computation error: {0}")]
    Computation(String),
}

impl From<quakewatch_common::Error> for Error {
    fn from(err: quakewatch_common::Error) -> Self {
        match err {
            quakewatch_common::Error::InvalidTimeFormat(msg) => Error::InvalidTimeFormat(msg),
            quakewatch_common::Error::Config(msg) => Error::Config(msg),
            quakewatch_common::Error::Io(e) => Error::Io(e),
            quakewatch_common::Error::Internal(msg) => Error::Computation(msg),
        }
    }
}

/// Convenience Result type using quakewatch-pd Error
pub type Result<T> = std::result::Result<T, Error>;
