//! Population capacity, happiness, and growth.

use serde::{Deserialize, Serialize};

use crate::catalog::{ModifierKind, PopulationRules};
use crate::modifiers::{self, ModifierTotals};
use crate::resources::{ResourceKind, ResourceSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HappinessBand {
    Happy,
    Content,
    Unhappy,
    Distressed,
}

pub fn band(happiness: f64) -> HappinessBand {
    if happiness >= 75.0 {
        HappinessBand::Happy
    } else if happiness >= 50.0 {
        HappinessBand::Content
    } else if happiness >= 25.0 {
        HappinessBand::Unhappy
    } else {
        HappinessBand::Distressed
    }
}

/// Display-only settlement size tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeTier {
    Outpost,
    Village,
    Town,
    City,
}

pub fn tier(population: u64) -> SizeTier {
    if population >= 500 {
        SizeTier::City
    } else if population >= 200 {
        SizeTier::Town
    } else if population >= 50 {
        SizeTier::Village
    } else {
        SizeTier::Outpost
    }
}

pub fn capacity(rules: &PopulationRules, totals: &ModifierTotals) -> u64 {
    let bonus = modifiers::total(totals, ModifierKind::PopulationCapacity).max(0.0);
    rules.base_capacity + bonus.round() as u64
}

/// Happiness in [0, 100] from supply ratios plus HAPPINESS modifier bonuses.
/// A supply ratio of 1.0 per needed resource is neutral (50); deficits pull
/// toward 0, surpluses push toward 100, capped at a 2x surplus.
pub fn happiness(production: &ResourceSet, need: &ResourceSet, totals: &ModifierTotals) -> f64 {
    let mut score = 0.0;
    let mut needed = 0u32;
    for kind in ResourceKind::ALL {
        let required = need.get(kind);
        if required <= 0.0 {
            continue;
        }
        needed += 1;
        let ratio = (production.get(kind) / required).clamp(0.0, 2.0);
        score += (ratio - 1.0) * 50.0;
    }
    let base = if needed > 0 {
        50.0 + score / f64::from(needed)
    } else {
        50.0
    };
    let bonus = modifiers::total(totals, ModifierKind::Happiness);
    (base + bonus).clamp(0.0, 100.0)
}

/// Signed population delta for one growth tick. Positive only below capacity
/// with happiness at or above the growth threshold; negative when distressed.
pub fn growth_rate(happiness: f64, current: u64, capacity: u64, rules: &PopulationRules) -> f64 {
    if happiness < rules.distress_threshold {
        return -(current as f64 * rules.decline_rate).max(if current > 0 { 1.0 } else { 0.0 });
    }
    if happiness < rules.growth_threshold || current >= capacity {
        return 0.0;
    }
    let headroom = (capacity - current) as f64;
    let seed = current.max(1) as f64;
    (seed * rules.growth_rate * (happiness / 100.0)).min(headroom)
}

pub fn apply_growth(current: u64, rate: f64) -> u64 {
    let next = current as i64 + rate.round() as i64;
    next.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PopulationRules {
        PopulationRules::default()
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(band(75.0), HappinessBand::Happy);
        assert_eq!(band(74.9), HappinessBand::Content);
        assert_eq!(band(50.0), HappinessBand::Content);
        assert_eq!(band(49.9), HappinessBand::Unhappy);
        assert_eq!(band(25.0), HappinessBand::Unhappy);
        assert_eq!(band(24.9), HappinessBand::Distressed);
    }

    #[test]
    fn tiers_follow_population_thresholds() {
        assert_eq!(tier(49), SizeTier::Outpost);
        assert_eq!(tier(50), SizeTier::Village);
        assert_eq!(tier(200), SizeTier::Town);
        assert_eq!(tier(500), SizeTier::City);
    }

    #[test]
    fn balanced_supply_is_neutral() {
        let need = ResourceSet {
            food: 2.0,
            water: 3.0,
            ..ResourceSet::default()
        };
        let happiness = happiness(&need.clone(), &need, &ModifierTotals::new());
        assert_eq!(happiness, 50.0);
    }

    #[test]
    fn deficit_depresses_and_surplus_raises() {
        let need = ResourceSet {
            food: 2.0,
            ..ResourceSet::default()
        };
        let short = ResourceSet {
            food: 1.0,
            ..ResourceSet::default()
        };
        let plenty = ResourceSet {
            food: 4.0,
            ..ResourceSet::default()
        };
        let totals = ModifierTotals::new();
        assert_eq!(happiness(&short, &need, &totals), 25.0);
        assert_eq!(happiness(&plenty, &need, &totals), 100.0);
    }

    #[test]
    fn happiness_modifiers_are_bounded() {
        let need = ResourceSet {
            food: 1.0,
            ..ResourceSet::default()
        };
        let mut totals = ModifierTotals::new();
        totals.insert(ModifierKind::Happiness, 500.0);
        assert_eq!(happiness(&need.clone(), &need, &totals), 100.0);
    }

    #[test]
    fn growth_requires_headroom_and_happiness() {
        let r = rules();
        assert_eq!(growth_rate(80.0, 100, 100, &r), 0.0);
        assert_eq!(growth_rate(40.0, 10, 100, &r), 0.0);
        assert!(growth_rate(80.0, 10, 100, &r) > 0.0);
    }

    #[test]
    fn distressed_settlements_shrink() {
        let r = rules();
        let rate = growth_rate(10.0, 100, 200, &r);
        assert!(rate < 0.0);
        assert!(apply_growth(100, rate) < 100);
    }

    #[test]
    fn growth_never_overshoots_capacity() {
        let r = PopulationRules {
            growth_rate: 10.0,
            ..rules()
        };
        let rate = growth_rate(100.0, 95, 100, &r);
        assert_eq!(rate, 5.0);
    }

    #[test]
    fn capacity_adds_population_modifiers_to_base() {
        let mut totals = ModifierTotals::new();
        totals.insert(ModifierKind::PopulationCapacity, 25.0);
        assert_eq!(capacity(&rules(), &totals), 35);
    }
}
