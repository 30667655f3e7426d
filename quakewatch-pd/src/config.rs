//! Forecast profiles and pipeline settings
//!
//! The four upstream prediction behaviors collapse into one pipeline
//! configured here: a grid policy crossed with an aggregation policy plus
//! scoring and significance knobs. Every formerly-hardcoded constant is a
//! named field with a documented default; behavior at defaults matches the
//! original variants exactly.

use quakewatch_common::config::TomlConfig;

/// Named preset selecting one of the four pipeline behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastProfile {
    /// Static bounding-box grid, spatial-radius aggregation over the whole
    /// catalog, full historical slice in the response
    Baseline,

    /// Static bounding-box grid, trailing 30-day window before the spatial
    /// scan, tsunami risk and cell details, 90-day historical slice
    RecentActivity,

    /// Time-modulated grid and features: hour-scaled sizing, harmonic score
    /// adjustment, time-warped depth/magnitude
    Harmonic,

    /// Date-filtered flat aggregation on a small day-modulated grid
    DailySnapshot,
}

impl ForecastProfile {
    /// Parse a profile name from configuration
    ///
    /// Accepts the canonical kebab-case names plus underscore and short
    /// aliases.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "baseline" => Some(ForecastProfile::Baseline),
            "recent-activity" | "recent_activity" | "recent" => {
                Some(ForecastProfile::RecentActivity)
            }
            "harmonic" => Some(ForecastProfile::Harmonic),
            "daily-snapshot" | "daily_snapshot" | "daily" => Some(ForecastProfile::DailySnapshot),
            _ => None,
        }
    }

    /// Canonical configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastProfile::Baseline => "baseline",
            ForecastProfile::RecentActivity => "recent-activity",
            ForecastProfile::Harmonic => "harmonic",
            ForecastProfile::DailySnapshot => "daily-snapshot",
        }
    }

    /// All profiles, for validation messages and tests
    pub fn all_variants() -> &'static [ForecastProfile] {
        &[
            ForecastProfile::Baseline,
            ForecastProfile::RecentActivity,
            ForecastProfile::Harmonic,
            ForecastProfile::DailySnapshot,
        ]
    }
}

impl Default for ForecastProfile {
    fn default() -> Self {
        ForecastProfile::Baseline
    }
}

impl std::fmt::Display for ForecastProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the lattice is placed over the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPolicy {
    /// Lattice spans the catalog's observed min/max latitude and longitude
    StaticBounds,
    /// Lattice spans `[center - spread, center + spread]` around the catalog
    /// mean coordinates
    DynamicCentered,
}

/// Spread formula for the dynamic-centered grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadRule {
    /// `spread_base + |day_factor|`
    AbsDay,
    /// `spread_base + 0.5 * day_factor`
    HalfDay,
}

/// How historical events are narrowed before aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationPolicy {
    /// Per-cell square neighborhood over the whole catalog
    SpatialRadius,
    /// Trailing N-day window, then the per-cell square neighborhood
    RecentWindow,
    /// Events near the target hour of day (mod 24), uniform across cells
    HourWindow,
    /// Events on the target calendar date, uniform across cells
    ExactDate,
}

/// Estimated-magnitude formula for retained cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnitudeRule {
    /// `local_max_magnitude * p` when local data existed, else `mean * p`
    LocalMaxBlend,
    /// `aggregate_magnitude * (0.5 + p / 2)`
    MeanBlend,
}

/// Historical slice included in the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoricalDetail {
    None,
    /// Whole catalog, lat/lon/magnitude columns
    FullCatalog,
    /// Trailing window ending at the target timestamp, all columns
    TrailingWindow,
}

/// Metadata block included in the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataDetail {
    None,
    /// Event count and magnitude summary of the historical window
    WindowSummary,
    /// Harmonic factors and prediction count
    HarmonicFactors,
    /// Harmonic factors plus hour and day-of-week
    CalendarFactors,
}

/// Grid Builder settings
#[derive(Debug, Clone)]
pub struct GridSettings {
    pub policy: GridPolicy,
    /// Base per-axis resolution `n`
    pub size: usize,
    /// Scale `n` by the hour factor: `n = size + size_gain * |hour_factor|`
    pub hour_scaled: bool,
    pub size_gain: f64,
    /// Base half-width of the dynamic grid, degrees
    pub spread_base: f64,
    pub spread_rule: SpreadRule,
    /// Hard cap on `n`; bounds the n^2 model evaluations per request
    pub max_size: usize,
}

/// Feature Aggregator settings
#[derive(Debug, Clone)]
pub struct AggregationSettings {
    pub policy: AggregationPolicy,
    /// Square neighborhood half-width, degrees per axis
    pub radius: f64,
    /// Trailing window length for `RecentWindow`, days
    pub window_days: i64,
    /// Half-width of the `HourWindow` policy, hours
    pub hour_window: u32,
}

/// Scorer settings
#[derive(Debug, Clone)]
pub struct ScoringSettings {
    /// Post-adjust raw probability by `1 + hour_gain*hf + day_gain*df`
    pub harmonic_adjustment: bool,
    pub hour_gain: f64,
    pub day_gain: f64,
    /// Warp aggregate depth/magnitude by the harmonic factors before scoring
    pub time_warped_features: bool,
    pub depth_hour_gain: f64,
    pub magnitude_day_gain: f64,
}

/// Significance Filter settings
#[derive(Debug, Clone)]
pub struct SignificanceSettings {
    /// Decision threshold; cells are retained strictly above it
    pub threshold: f64,
    pub magnitude_rule: MagnitudeRule,
}

/// Response Assembler settings
#[derive(Debug, Clone)]
pub struct ResponseSettings {
    pub historical: HistoricalDetail,
    /// Window length for `TrailingWindow`, days
    pub historical_window_days: i64,
    pub metadata: MetadataDetail,
    /// Include per-cell depth/tsunami/significance on predictions
    pub cell_details: bool,
}

/// Complete pipeline settings for one forecast profile
#[derive(Debug, Clone)]
pub struct ForecastSettings {
    pub profile: ForecastProfile,
    pub grid: GridSettings,
    pub aggregation: AggregationSettings,
    pub scoring: ScoringSettings,
    pub significance: SignificanceSettings,
    pub response: ResponseSettings,
}

impl ForecastSettings {
    /// Settings preset for a profile, with the documented defaults
    pub fn for_profile(profile: ForecastProfile) -> Self {
        let mut settings = Self {
            profile,
            grid: GridSettings {
                policy: GridPolicy::StaticBounds,
                size: 20,
                hour_scaled: false,
                size_gain: 5.0,
                spread_base: 2.0,
                spread_rule: SpreadRule::AbsDay,
                max_size: 50,
            },
            aggregation: AggregationSettings {
                policy: AggregationPolicy::SpatialRadius,
                radius: 0.5,
                window_days: 30,
                hour_window: 3,
            },
            scoring: ScoringSettings {
                harmonic_adjustment: false,
                hour_gain: 0.2,
                day_gain: 0.1,
                time_warped_features: false,
                depth_hour_gain: 0.2,
                magnitude_day_gain: 0.15,
            },
            significance: SignificanceSettings {
                threshold: 0.5,
                magnitude_rule: MagnitudeRule::LocalMaxBlend,
            },
            response: ResponseSettings {
                historical: HistoricalDetail::None,
                historical_window_days: 90,
                metadata: MetadataDetail::None,
                cell_details: false,
            },
        };

        match profile {
            ForecastProfile::Baseline => {
                settings.response.historical = HistoricalDetail::FullCatalog;
            }
            ForecastProfile::RecentActivity => {
                settings.aggregation.policy = AggregationPolicy::RecentWindow;
                settings.response.historical = HistoricalDetail::TrailingWindow;
                settings.response.metadata = MetadataDetail::WindowSummary;
                settings.response.cell_details = true;
            }
            ForecastProfile::Harmonic => {
                settings.grid.policy = GridPolicy::DynamicCentered;
                settings.grid.size = 10;
                settings.grid.hour_scaled = true;
                settings.aggregation.policy = AggregationPolicy::HourWindow;
                settings.scoring.harmonic_adjustment = true;
                settings.scoring.time_warped_features = true;
                settings.significance.magnitude_rule = MagnitudeRule::MeanBlend;
                settings.response.metadata = MetadataDetail::HarmonicFactors;
            }
            ForecastProfile::DailySnapshot => {
                settings.grid.policy = GridPolicy::DynamicCentered;
                settings.grid.size = 10;
                settings.grid.spread_rule = SpreadRule::HalfDay;
                settings.aggregation.policy = AggregationPolicy::ExactDate;
                settings.significance.magnitude_rule = MagnitudeRule::MeanBlend;
                settings.response.metadata = MetadataDetail::CalendarFactors;
            }
        }
        settings
    }

    /// Apply config-file overrides on top of the profile preset
    pub fn with_overrides(mut self, config: &TomlConfig) -> Self {
        if let Some(threshold) = config.threshold {
            self.significance.threshold = threshold;
        }
        if let Some(radius) = config.radius {
            self.aggregation.radius = radius;
        }
        if let Some(max_grid_size) = config.max_grid_size {
            self.grid.max_size = max_grid_size;
        }
        self
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self::for_profile(ForecastProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_name_round_trip() {
        for profile in ForecastProfile::all_variants() {
            let parsed = ForecastProfile::from_str(profile.as_str()).unwrap();
            assert_eq!(*profile, parsed, "round-trip failed for {:?}", profile);
        }
    }

    #[test]
    fn test_profile_parse_aliases() {
        assert_eq!(
            ForecastProfile::from_str("recent"),
            Some(ForecastProfile::RecentActivity)
        );
        assert_eq!(
            ForecastProfile::from_str("recent_activity"),
            Some(ForecastProfile::RecentActivity)
        );
        assert_eq!(
            ForecastProfile::from_str("DAILY"),
            Some(ForecastProfile::DailySnapshot)
        );
        assert_eq!(ForecastProfile::from_str("unknown"), None);
        assert_eq!(ForecastProfile::from_str(""), None);
    }

    #[test]
    fn test_baseline_defaults_match_contract() {
        let settings = ForecastSettings::for_profile(ForecastProfile::Baseline);
        assert_eq!(settings.grid.policy, GridPolicy::StaticBounds);
        assert_eq!(settings.grid.size, 20);
        assert_eq!(settings.aggregation.radius, 0.5);
        assert_eq!(settings.significance.threshold, 0.5);
        assert_eq!(
            settings.significance.magnitude_rule,
            MagnitudeRule::LocalMaxBlend
        );
        assert!(!settings.scoring.harmonic_adjustment);
        assert_eq!(settings.response.historical, HistoricalDetail::FullCatalog);
    }

    #[test]
    fn test_harmonic_preset_is_time_sensitive() {
        let settings = ForecastSettings::for_profile(ForecastProfile::Harmonic);
        assert_eq!(settings.grid.policy, GridPolicy::DynamicCentered);
        assert!(settings.grid.hour_scaled);
        assert_eq!(settings.aggregation.policy, AggregationPolicy::HourWindow);
        assert!(settings.scoring.harmonic_adjustment);
        assert!(settings.scoring.time_warped_features);
        assert_eq!(settings.significance.magnitude_rule, MagnitudeRule::MeanBlend);
    }

    #[test]
    fn test_daily_snapshot_spread_rule() {
        let settings = ForecastSettings::for_profile(ForecastProfile::DailySnapshot);
        assert_eq!(settings.grid.spread_rule, SpreadRule::HalfDay);
        assert!(!settings.grid.hour_scaled);
        assert_eq!(settings.aggregation.policy, AggregationPolicy::ExactDate);
    }

    #[test]
    fn test_overrides_apply() {
        let toml = TomlConfig {
            threshold: Some(0.7),
            radius: Some(1.0),
            max_grid_size: Some(25),
            ..Default::default()
        };
        let settings = ForecastSettings::default().with_overrides(&toml);
        assert_eq!(settings.significance.threshold, 0.7);
        assert_eq!(settings.aggregation.radius, 1.0);
        assert_eq!(settings.grid.max_size, 25);
    }
}
