//! Structure modifier formula evaluation.

use thiserror::Error;

use crate::catalog::{ModifierConfig, ScalingFormula};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("modifier level must be at least 1, got {0}")]
pub struct InvalidLevel(pub u32);

/// Evaluates a modifier config at a structure level. Deterministic, so the
/// client can preview upgrade effects without a server round trip.
pub fn modifier_value(config: &ModifierConfig, level: u32) -> Result<f64, InvalidLevel> {
    if level < 1 {
        return Err(InvalidLevel(level));
    }
    let level_f = f64::from(level);
    let raw = match config.formula {
        ScalingFormula::Linear => config.base * level_f,
        ScalingFormula::Exponential => config.base * 1.5_f64.powi(level as i32 - 1),
        ScalingFormula::Diminishing => config.base * (1.0 + (level_f + 1.0).log2()),
    };
    Ok(round2(raw))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
