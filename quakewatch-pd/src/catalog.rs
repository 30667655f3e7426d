//! Historical event catalog
//!
//! Bulk-loads the processed earthquake catalog from CSV into memory once at
//! startup. The catalog is read-only for the life of the process; requests
//! only filter and aggregate over it.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::error::{Error, Result};
use quakewatch_common::time::TIMESTAMP_FORMAT;

/// One historical earthquake record.
///
/// Latitude, longitude, depth, magnitude, and timestamp are always present;
/// the auxiliary measurement columns vary by catalog and are optional per
/// row (empty CSV cells deserialize to `None`).
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub latitude: f64,
    pub longitude: f64,
    pub depth: f64,
    pub magnitude: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub station_count: Option<f64>,
    #[serde(default)]
    pub gap: Option<f64>,
    #[serde(default)]
    pub closeness: Option<f64>,
    #[serde(default)]
    pub rms: Option<f64>,
    #[serde(default)]
    pub significance: Option<f64>,
    /// Tsunami flag, nonzero when the event produced a tsunami
    #[serde(default)]
    pub tsunami: Option<f64>,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(D::Error::custom)
}

impl Event {
    pub fn hour_of_day(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Value of one aggregatable column, `None` when the row lacks it
    pub fn field(&self, field: EventField) -> Option<f64> {
        match field {
            EventField::Depth => Some(self.depth),
            EventField::Magnitude => Some(self.magnitude),
            EventField::StationCount => self.station_count,
            EventField::Gap => self.gap,
            EventField::Closeness => self.closeness,
            EventField::Rms => self.rms,
            EventField::Significance => self.significance,
        }
    }
}

/// Aggregatable event columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    Depth,
    Magnitude,
    StationCount,
    Gap,
    Closeness,
    Rms,
    Significance,
}

impl EventField {
    pub const ALL: [EventField; 7] = [
        EventField::Depth,
        EventField::Magnitude,
        EventField::StationCount,
        EventField::Gap,
        EventField::Closeness,
        EventField::Rms,
        EventField::Significance,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

/// Catalog-wide statistics, computed once at load time.
///
/// Means over optional columns cover the rows that carry the column; a
/// column absent from every row has mean 0.0 so fallback values are always
/// numeric.
#[derive(Debug, Clone)]
pub struct CatalogStats {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lat_mean: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub lon_mean: f64,
    pub first_timestamp: NaiveDateTime,
    pub last_timestamp: NaiveDateTime,
    means: [f64; 7],
}

impl CatalogStats {
    fn from_events(events: &[Event]) -> Self {
        let n = events.len() as f64;
        let mut lat_min = f64::INFINITY;
        let mut lat_max = f64::NEG_INFINITY;
        let mut lon_min = f64::INFINITY;
        let mut lon_max = f64::NEG_INFINITY;
        let mut lat_sum = 0.0;
        let mut lon_sum = 0.0;
        let mut first = events[0].timestamp;
        let mut last = events[0].timestamp;

        for event in events {
            lat_min = lat_min.min(event.latitude);
            lat_max = lat_max.max(event.latitude);
            lon_min = lon_min.min(event.longitude);
            lon_max = lon_max.max(event.longitude);
            lat_sum += event.latitude;
            lon_sum += event.longitude;
            first = first.min(event.timestamp);
            last = last.max(event.timestamp);
        }

        let mut means = [0.0; 7];
        for (i, field) in EventField::ALL.iter().enumerate() {
            means[i] = mean_field(events.iter(), *field).unwrap_or(0.0);
        }

        Self {
            lat_min,
            lat_max,
            lat_mean: lat_sum / n,
            lon_min,
            lon_max,
            lon_mean: lon_sum / n,
            first_timestamp: first,
            last_timestamp: last,
            means,
        }
    }

    /// Catalog-wide mean of one column
    pub fn mean(&self, field: EventField) -> f64 {
        self.means[field.index()]
    }
}

/// Mean of one column over a set of events, `None` when no row carries it
pub fn mean_field<'a, I>(events: I, field: EventField) -> Option<f64>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for event in events {
        if let Some(value) = event.field(field) {
            sum += value;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Circular distance between two hours of day, in [0, 12]
pub fn hour_distance(a: u32, b: u32) -> u32 {
    let diff = (a as i32 - b as i32).rem_euclid(24) as u32;
    diff.min(24 - diff)
}

/// In-memory historical event catalog with precomputed stats
#[derive(Debug, Clone)]
pub struct EventCatalog {
    events: Vec<Event>,
    stats: CatalogStats,
}

impl EventCatalog {
    /// Load the catalog from a CSV file. An empty catalog is rejected: the
    /// pipeline has no fallback values without at least one event.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::MissingCollaborator(format!("catalog {}: {}", path.display(), e))
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut events = Vec::new();
        for row in reader.deserialize() {
            events.push(row?);
        }
        Self::from_events(events)
    }

    /// Build a catalog from already-parsed events (used by tests and any
    /// future non-CSV loader). Rejects an empty event list.
    pub fn from_events(events: Vec<Event>) -> Result<Self> {
        if events.is_empty() {
            return Err(Error::MissingCollaborator(
                "catalog contains no events".to_string(),
            ));
        }
        let stats = CatalogStats::from_events(&events);
        Ok(Self { events, stats })
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn stats(&self) -> &CatalogStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events with `start <= timestamp <= end`
    pub fn events_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .collect()
    }

    /// Events whose hour of day lies within `window` hours of `hour`,
    /// modulo 24 (wraparound included: hour 0 with window 3 covers
    /// {21, 22, 23, 0, 1, 2, 3})
    pub fn events_in_hour_window(&self, hour: u32, window: u32) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| hour_distance(e.hour_of_day(), hour) <= window)
            .collect()
    }

    /// Events whose calendar date equals `date`
    pub fn events_on_date(&self, date: NaiveDate) -> Vec<&Event> {
        self.events.iter().filter(|e| e.date() == date).collect()
    }
}

/// Events within the square neighborhood `|lat - lat_cell| <= radius` AND
/// `|lon - lon_cell| <= radius`.
///
/// Per-axis bounds, not geodesic distance: the neighborhood is a square.
/// This approximation is part of the observable contract and is preserved
/// as-is.
pub fn within_square<'a>(
    events: &[&'a Event],
    lat: f64,
    lon: f64,
    radius: f64,
) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|e| (e.latitude - lat).abs() <= radius && (e.longitude - lon).abs() <= radius)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn event(lat: f64, lon: f64, mag: f64, ts: &str) -> Event {
        Event {
            latitude: lat,
            longitude: lon,
            depth: 10.0,
            magnitude: mag,
            timestamp: NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).unwrap(),
            station_count: None,
            gap: None,
            closeness: None,
            rms: None,
            significance: None,
            tsunami: None,
        }
    }

    #[test]
    fn test_load_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "latitude,longitude,depth,magnitude,timestamp,station_count,gap,closeness,rms,significance,tsunami"
        )
        .unwrap();
        writeln!(file, "34.0,-118.0,12.5,4.1,2024-01-01 10:00:00,12,140,0.2,0.5,620,0").unwrap();
        writeln!(file, "35.5,-117.0,8.0,3.2,2024-02-10 22:30:00,,,,,,").unwrap();

        let catalog = EventCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.events()[0].station_count, Some(12.0));
        assert_eq!(catalog.events()[1].station_count, None);
        assert_eq!(catalog.stats().lat_min, 34.0);
        assert_eq!(catalog.stats().lat_max, 35.5);
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(
            EventCatalog::from_events(Vec::new()),
            Err(Error::MissingCollaborator(_))
        ));
    }

    #[test]
    fn test_stats_means_with_missing_columns() {
        let mut a = event(34.0, -118.0, 4.0, "2024-01-01 00:00:00");
        a.rms = Some(0.4);
        let mut b = event(36.0, -116.0, 2.0, "2024-01-02 00:00:00");
        b.rms = None;
        let catalog = EventCatalog::from_events(vec![a, b]).unwrap();

        let stats = catalog.stats();
        assert_eq!(stats.mean(EventField::Magnitude), 3.0);
        // Mean over rows that carry the column
        assert_eq!(stats.mean(EventField::Rms), 0.4);
        // Column absent everywhere falls back to 0.0, never NaN
        assert_eq!(stats.mean(EventField::Gap), 0.0);
        assert_eq!(stats.lat_mean, 35.0);
    }

    #[test]
    fn test_events_between_inclusive() {
        let catalog = EventCatalog::from_events(vec![
            event(34.0, -118.0, 4.0, "2024-01-01 00:00:00"),
            event(34.0, -118.0, 4.0, "2024-01-15 12:00:00"),
            event(34.0, -118.0, 4.0, "2024-02-01 00:00:00"),
        ])
        .unwrap();

        let start = NaiveDateTime::parse_from_str("2024-01-01 00:00:00", TIMESTAMP_FORMAT).unwrap();
        let end = NaiveDateTime::parse_from_str("2024-01-15 12:00:00", TIMESTAMP_FORMAT).unwrap();
        let selected = catalog.events_between(start, end);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_hour_distance_wraparound() {
        assert_eq!(hour_distance(23, 0), 1);
        assert_eq!(hour_distance(0, 23), 1);
        assert_eq!(hour_distance(21, 0), 3);
        assert_eq!(hour_distance(12, 0), 12);
        assert_eq!(hour_distance(5, 5), 0);
    }

    #[test]
    fn test_hour_window_includes_wrapped_hours() {
        let events: Vec<Event> = (0..24)
            .map(|h| event(34.0, -118.0, 4.0, &format!("2024-01-01 {:02}:00:00", h)))
            .collect();
        let catalog = EventCatalog::from_events(events).unwrap();

        let hours: Vec<u32> = catalog
            .events_in_hour_window(0, 3)
            .iter()
            .map(|e| e.hour_of_day())
            .collect();
        assert_eq!(hours, vec![0, 1, 2, 3, 21, 22, 23]);
    }

    #[test]
    fn test_events_on_date() {
        let catalog = EventCatalog::from_events(vec![
            event(34.0, -118.0, 4.0, "2024-03-15 08:00:00"),
            event(34.0, -118.0, 4.0, "2024-03-15 20:00:00"),
            event(34.0, -118.0, 4.0, "2024-03-16 08:00:00"),
        ])
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(catalog.events_on_date(date).len(), 2);
    }

    #[test]
    fn test_within_square_uses_per_axis_bounds() {
        let a = event(34.4, -118.4, 4.0, "2024-01-01 00:00:00");
        let b = event(34.6, -118.0, 4.0, "2024-01-01 00:00:00");
        let catalog = EventCatalog::from_events(vec![a, b]).unwrap();
        let all: Vec<&Event> = catalog.events().iter().collect();

        // (0.4, 0.4) away on both axes is inside the square even though its
        // euclidean distance exceeds 0.5
        let local = within_square(&all, 34.0, -118.0, 0.5);
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].latitude, 34.4);
    }
}
