//! Request time resolution
//!
//! Parses the `{date, time}` pair of a prediction request into a calendar
//! timestamp and derives the calendar fields and harmonic factors consumed
//! by the forecast pipeline.

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;

use crate::{Error, Result};

/// Format accepted for request timestamps and used in responses
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-request time context, derived once and immutable for the duration
/// of the pipeline.
///
/// Day-of-week is numbered with Monday = 0, matching the convention the
/// historical catalogs were processed with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestContext {
    /// Target calendar timestamp
    pub timestamp: NaiveDateTime,
    /// Day of week, Monday = 0 through Sunday = 6
    pub day_of_week: u32,
    /// Hour of day, 0 through 23
    pub hour_of_day: u32,
    /// sin(2π · hour_of_day / 24)
    pub hour_factor: f64,
    /// sin(2π · day_of_week / 7)
    pub day_factor: f64,
}

impl RequestContext {
    /// Parse a `YYYY-MM-DD` date and `HH:MM:SS` time into a request context.
    pub fn parse(date: &str, time: &str) -> Result<Self> {
        let combined = format!("{} {}", date.trim(), time.trim());
        let timestamp = NaiveDateTime::parse_from_str(&combined, TIMESTAMP_FORMAT)
            .map_err(|e| Error::InvalidTimeFormat(format!("'{}': {}", combined, e)))?;
        Ok(Self::from_timestamp(timestamp))
    }

    /// Derive the context from an already-parsed timestamp.
    pub fn from_timestamp(timestamp: NaiveDateTime) -> Self {
        let day_of_week = timestamp.weekday().num_days_from_monday();
        let hour_of_day = timestamp.hour();
        Self {
            timestamp,
            day_of_week,
            hour_of_day,
            hour_factor: hour_factor(hour_of_day),
            day_factor: day_factor(day_of_week),
        }
    }

    /// Response-facing timestamp string (`YYYY-MM-DD HH:MM:SS`).
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Harmonic factor for an hour of day: sin(2π · hour / 24), in [-1, 1].
pub fn hour_factor(hour_of_day: u32) -> f64 {
    (2.0 * PI * hour_of_day as f64 / 24.0).sin()
}

/// Harmonic factor for a day of week: sin(2π · day / 7), in [-1, 1].
pub fn day_factor(day_of_week: u32) -> f64 {
    (2.0 * PI * day_of_week as f64 / 7.0).sin()
}
