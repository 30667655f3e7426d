//! Common error types for QuakeWatch

use thiserror::Error;

/// Common result type for QuakeWatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across QuakeWatch services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unparsable date/time in a prediction request
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
