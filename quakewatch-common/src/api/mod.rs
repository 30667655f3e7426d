//! Shared API types for QuakeWatch services

pub mod types;

pub use types::*;
