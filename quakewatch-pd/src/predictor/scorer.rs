//! Scorer
//!
//! Evaluates the classifier on one cell's feature vector and applies the
//! optional harmonic post-adjustment. The adjusted probability is always
//! clamped back into [0, 1].

use crate::config::ScoringSettings;
use crate::error::Result;
use crate::model::GradientBoostedModel;
use quakewatch_common::RequestContext;

/// Score one feature vector: model probability, then the profile's
/// harmonic adjustment.
pub fn score(
    model: &GradientBoostedModel,
    features: &[f64],
    scoring: &ScoringSettings,
    ctx: &RequestContext,
) -> Result<f64> {
    let raw = model.predict_probability(features)?;
    Ok(adjust_probability(raw, scoring, ctx))
}

/// `adjusted = raw · (1 + k1·hour_factor + k2·day_factor)`, clamped to
/// [0, 1]; identity when the adjustment is disabled.
pub fn adjust_probability(raw: f64, scoring: &ScoringSettings, ctx: &RequestContext) -> f64 {
    if !scoring.harmonic_adjustment {
        return raw;
    }
    let factor = 1.0 + scoring.hour_gain * ctx.hour_factor + scoring.day_gain * ctx.day_factor;
    (raw * factor).clamp(0.0, 1.0)
}
