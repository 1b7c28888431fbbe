//! Maps structure health to an output multiplier.

use serde::{Deserialize, Serialize};

/// Which health-to-output curve applies. Game design has produced evidence
/// for both shapes, so the curve is catalog configuration rather than a
/// hard-coded constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectivenessCurve {
    /// Damage has a dampened effect: `0.4 + 0.006 * health`, so 50 health
    /// still yields 70% output and even 1 health stays near the 40% floor.
    #[default]
    Dampened,
    /// Output falls linearly with health: `health / 100`.
    Proportional,
}

/// Output factor in (0, 1] for a functional structure, 0.0 when destroyed.
pub fn effectiveness(curve: EffectivenessCurve, health: u8) -> f64 {
    if health == 0 {
        return 0.0;
    }
    let health = f64::from(health.min(100));
    match curve {
        EffectivenessCurve::Dampened => 0.4 + 0.006 * health,
        EffectivenessCurve::Proportional => health / 100.0,
    }
}
