//! # QuakeWatch Prediction Daemon
//!
//! Serves discretized maps of elevated seismic-activity probability for a
//! requested timestamp: a spatial grid is scored cell-by-cell through a
//! trained classifier over features aggregated from a historical event
//! catalog, and cells above the significance threshold are reported with an
//! estimated magnitude.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod predictor;

pub use error::{Error, Result};
