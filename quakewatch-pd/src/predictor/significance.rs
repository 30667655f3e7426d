//! Significance Filter
//!
//! Applies the decision threshold and the per-profile magnitude estimate.
//! Both formulas are part of the observable contract and are preserved
//! exactly.

use crate::config::MagnitudeRule;
use crate::predictor::features::CellAggregates;

/// A cell is retained iff its adjusted probability strictly exceeds the
/// threshold; the boundary value itself is excluded.
pub fn is_significant(probability: f64, threshold: f64) -> bool {
    probability > threshold
}

/// Estimated magnitude for a retained cell
pub fn estimate_magnitude(
    rule: MagnitudeRule,
    aggregates: &CellAggregates,
    probability: f64,
) -> f64 {
    match rule {
        MagnitudeRule::LocalMaxBlend => match aggregates.local_max_magnitude {
            Some(local_max) if aggregates.has_local_data => local_max * probability,
            _ => aggregates.magnitude * probability,
        },
        MagnitudeRule::MeanBlend => aggregates.magnitude * (0.5 + probability / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregates(magnitude: f64, local_max: Option<f64>) -> CellAggregates {
        CellAggregates {
            depth: 0.0,
            magnitude,
            station_count: 0.0,
            gap: 0.0,
            closeness: 0.0,
            rms: 0.0,
            significance: 0.0,
            local_max_magnitude: local_max,
            tsunami_risk: None,
            has_local_data: local_max.is_some(),
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!is_significant(0.5, 0.5));
        assert!(is_significant(0.500001, 0.5));
        assert!(!is_significant(0.499999, 0.5));
        assert!(is_significant(1.0, 0.5));
        assert!(!is_significant(0.0, 0.5));
    }

    #[test]
    fn test_local_max_blend_with_local_data() {
        let a = aggregates(4.0, Some(6.0));
        assert!((estimate_magnitude(MagnitudeRule::LocalMaxBlend, &a, 0.8) - 4.8).abs() < 1e-9);
    }

    #[test]
    fn test_local_max_blend_falls_back_to_mean() {
        let a = aggregates(4.0, None);
        assert!((estimate_magnitude(MagnitudeRule::LocalMaxBlend, &a, 0.8) - 3.2).abs() < 1e-9);
    }

    #[test]
    fn test_mean_blend_formula() {
        let a = aggregates(4.0, Some(6.0));
        // 4.0 * (0.5 + 0.8/2) = 3.6; the local max is not consulted
        assert!((estimate_magnitude(MagnitudeRule::MeanBlend, &a, 0.8) - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_zero_mean_zero_probability_yields_zero() {
        let a = aggregates(0.0, None);
        assert_eq!(estimate_magnitude(MagnitudeRule::LocalMaxBlend, &a, 0.0), 0.0);
    }
}
