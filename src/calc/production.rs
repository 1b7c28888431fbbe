//! Production and consumption: extractors turn tile quality into resource
//! deltas, populations and standing structures consume them.

use std::collections::BTreeMap;

use crate::calc::effectiveness::{effectiveness, EffectivenessCurve};
use crate::catalog::{Catalog, CatalogError, ConsumptionRates, ModifierKind, StructureDef};
use crate::modifiers::{self, ModifierTotals};
use crate::rates::BaseRates;
use crate::resources::{ResourceKind, ResourceSet};
use crate::world::{Settlement, Tile, TileId};

/// Quality assumed for a structure whose tile is unknown.
pub const FALLBACK_QUALITY: f64 = 50.0;

/// Output of a single extractor for one resource tick. Buildings yield zero.
pub fn structure_production(
    def: &StructureDef,
    base: &ResourceSet,
    level: u32,
    health: u8,
    quality: Option<&ResourceSet>,
    biome: &ResourceSet,
    world_multiplier: f64,
    curve: EffectivenessCurve,
) -> ResourceSet {
    let mut out = ResourceSet::default();
    if !def.is_extractor() {
        return out;
    }
    let factor = effectiveness(curve, health);
    if factor == 0.0 {
        return out;
    }
    for kind in ResourceKind::ALL {
        let rate = base.get(kind);
        if rate == 0.0 {
            continue;
        }
        let quality_factor = quality
            .map(|q| q.get(kind))
            .unwrap_or(FALLBACK_QUALITY)
            .clamp(0.0, 100.0)
            / 100.0;
        out.set(
            kind,
            rate * quality_factor * f64::from(level) * factor * biome.get(kind) * world_multiplier,
        );
    }
    out
}

/// Flat per-tick bonuses contributed by production modifiers.
pub fn modifier_bonus(totals: &ModifierTotals) -> ResourceSet {
    ResourceSet {
        food: modifiers::total(totals, ModifierKind::FoodProduction),
        water: modifiers::total(totals, ModifierKind::WaterProduction),
        wood: modifiers::total(totals, ModifierKind::WoodProduction),
        stone: modifiers::total(totals, ModifierKind::StoneProduction),
        ore: modifiers::total(totals, ModifierKind::OreProduction),
    }
}

/// Aggregates production across all extractors in a settlement. Resources
/// with no active extractor stay zero; non-extractors are skipped without
/// error.
pub fn settlement_production(
    settlement: &Settlement,
    catalog: &Catalog,
    rates: &BaseRates,
    tiles: &BTreeMap<TileId, Tile>,
) -> Result<ResourceSet, CatalogError> {
    let mut production = ResourceSet::default();
    for structure in &settlement.structures {
        let def = catalog.definition(structure.kind)?;
        if !def.is_extractor() {
            continue;
        }
        let base = rates.get(&structure.kind).copied().unwrap_or(def.production);
        let tile = structure.tile.and_then(|id| tiles.get(&id));
        let quality = tile.map(|t| &t.quality);
        let biome = tile
            .map(|t| catalog.biome_multipliers(t.biome))
            .unwrap_or_else(|| ResourceSet::uniform(1.0));
        production.add(&structure_production(
            def,
            &base,
            structure.level,
            structure.health,
            quality,
            &biome,
            catalog.world_multiplier,
            catalog.effectiveness,
        ));
    }
    production.add(&modifier_bonus(&settlement.modifier_totals));
    Ok(production)
}

/// Per-capita needs scale with population; upkeep scales with standing
/// structure count.
pub fn settlement_consumption(
    population: u64,
    standing_structures: usize,
    rates: &ConsumptionRates,
) -> ResourceSet {
    let mut consumption = ResourceSet::default();
    let citizens = population as f64;
    let standing = standing_structures as f64;
    for kind in ResourceKind::ALL {
        consumption.set(
            kind,
            rates.per_capita.get(kind) * citizens + rates.upkeep_per_building.get(kind) * standing,
        );
    }
    consumption
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StructureCategory, StructureKind};

    fn farm_def() -> StructureDef {
        StructureDef {
            kind: StructureKind::Farm,
            category: StructureCategory::Extractor,
            production: ResourceSet {
                food: 10.0,
                ..ResourceSet::default()
            },
            build_cost: ResourceSet::default(),
            max_level: 5,
            prerequisites: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    fn produce(level: u32, health: u8, quality: f64, curve: EffectivenessCurve) -> f64 {
        let def = farm_def();
        let quality_set = ResourceSet::uniform(quality);
        structure_production(
            &def,
            &def.production,
            level,
            health,
            Some(&quality_set),
            &ResourceSet::uniform(1.0),
            1.0,
            curve,
        )
        .food
    }

    #[test]
    fn full_quality_full_health_level_one_yields_base_rate() {
        assert_eq!(produce(1, 100, 100.0, EffectivenessCurve::Dampened), 10.0);
    }

    #[test]
    fn half_quality_halves_output() {
        assert_eq!(produce(1, 100, 50.0, EffectivenessCurve::Dampened), 5.0);
    }

    #[test]
    fn level_three_triples_output() {
        assert_eq!(produce(3, 100, 100.0, EffectivenessCurve::Dampened), 30.0);
    }

    #[test]
    fn half_health_yields_seventy_percent_under_dampened_curve() {
        assert_eq!(produce(1, 50, 100.0, EffectivenessCurve::Dampened), 7.0);
    }

    #[test]
    fn half_health_yields_half_under_proportional_curve() {
        assert_eq!(produce(1, 50, 100.0, EffectivenessCurve::Proportional), 5.0);
    }

    #[test]
    fn destroyed_extractor_produces_nothing() {
        assert_eq!(produce(1, 0, 100.0, EffectivenessCurve::Dampened), 0.0);
    }

    #[test]
    fn unknown_tile_falls_back_to_half_quality() {
        let def = farm_def();
        let out = structure_production(
            &def,
            &def.production,
            1,
            100,
            None,
            &ResourceSet::uniform(1.0),
            1.0,
            EffectivenessCurve::Dampened,
        );
        assert_eq!(out.food, 5.0);
    }

    #[test]
    fn biome_and_world_multipliers_stack() {
        let def = farm_def();
        let quality = ResourceSet::uniform(100.0);
        let biome = ResourceSet {
            food: 1.25,
            ..ResourceSet::uniform(1.0)
        };
        let out = structure_production(
            &def,
            &def.production,
            1,
            100,
            Some(&quality),
            &biome,
            2.0,
            EffectivenessCurve::Dampened,
        );
        assert_eq!(out.food, 25.0);
    }

    #[test]
    fn buildings_contribute_zero_without_error() {
        let def = StructureDef {
            category: StructureCategory::Building,
            production: ResourceSet::default(),
            ..farm_def()
        };
        let out = structure_production(
            &def,
            &ResourceSet::default(),
            1,
            100,
            None,
            &ResourceSet::uniform(1.0),
            1.0,
            EffectivenessCurve::Dampened,
        );
        assert!(out.is_zero());
    }

    #[test]
    fn consumption_scales_with_population_and_structures() {
        let rates = ConsumptionRates::default();
        let consumption = settlement_consumption(10, 2, &rates);
        assert_eq!(consumption.food, 2.0); // 10 * 0.2
        assert_eq!(consumption.water, 3.0); // 10 * 0.3
        assert_eq!(consumption.wood, 0.2); // 2 * 0.1
    }
}
