//! Structure and balance configuration: definitions, modifier configs, base
//! rates, biome multipliers. Loaded once, read-only at runtime.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calc::effectiveness::EffectivenessCurve;
use crate::resources::ResourceSet;

/// Every structure type the engine knows about, resolved at load time so
/// lookups are exhaustive matches instead of string comparisons.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Farm,
    Well,
    LumberCamp,
    Quarry,
    Mine,
    TownHall,
    House,
    Granary,
    Tavern,
}

impl StructureKind {
    pub fn display_name(self) -> &'static str {
        match self {
            StructureKind::Farm => "Farm",
            StructureKind::Well => "Well",
            StructureKind::LumberCamp => "Lumber Camp",
            StructureKind::Quarry => "Quarry",
            StructureKind::Mine => "Mine",
            StructureKind::TownHall => "Town Hall",
            StructureKind::House => "House",
            StructureKind::Granary => "Granary",
            StructureKind::Tavern => "Tavern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureCategory {
    Extractor,
    Building,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    Plains,
    Forest,
    Mountains,
    Desert,
    Tundra,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierKind {
    FoodProduction,
    WaterProduction,
    WoodProduction,
    StoneProduction,
    OreProduction,
    StorageCapacity,
    PopulationCapacity,
    Happiness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingFormula {
    Linear,
    Exponential,
    Diminishing,
}

/// A level-scaled bonus a structure contributes to its settlement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierConfig {
    pub kind: ModifierKind,
    pub formula: ScalingFormula,
    pub base: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    pub structure: StructureKind,
    pub min_level: u32,
}

fn default_max_level() -> u32 {
    5
}

/// Immutable template for one structure type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureDef {
    pub kind: StructureKind,
    pub category: StructureCategory,
    /// Base production per resource tick, before any multipliers. Extractors
    /// only; buildings leave this zeroed.
    #[serde(default)]
    pub production: ResourceSet,
    #[serde(default)]
    pub build_cost: ResourceSet,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    #[serde(default)]
    pub modifiers: Vec<ModifierConfig>,
}

impl StructureDef {
    pub fn is_extractor(&self) -> bool {
        self.category == StructureCategory::Extractor
    }
}

fn default_per_capita() -> ResourceSet {
    ResourceSet {
        food: 0.2,
        water: 0.3,
        ..ResourceSet::default()
    }
}

fn default_upkeep() -> ResourceSet {
    ResourceSet {
        wood: 0.1,
        stone: 0.05,
        ore: 0.02,
        ..ResourceSet::default()
    }
}

/// What a settlement consumes each resource tick: per-capita needs scale with
/// population, upkeep scales with building count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionRates {
    #[serde(default = "default_per_capita")]
    pub per_capita: ResourceSet,
    #[serde(default = "default_upkeep")]
    pub upkeep_per_building: ResourceSet,
}

impl Default for ConsumptionRates {
    fn default() -> Self {
        Self {
            per_capita: default_per_capita(),
            upkeep_per_building: default_upkeep(),
        }
    }
}

fn default_base_capacity() -> u64 {
    10
}

fn default_growth_threshold() -> f64 {
    50.0
}

fn default_distress_threshold() -> f64 {
    25.0
}

fn default_growth_rate() -> f64 {
    0.02
}

fn default_decline_rate() -> f64 {
    0.01
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationRules {
    /// Housing every settlement has before POPULATION_CAPACITY bonuses.
    #[serde(default = "default_base_capacity")]
    pub base_capacity: u64,
    /// Happiness at or above this grows the population (given headroom).
    #[serde(default = "default_growth_threshold")]
    pub growth_threshold: f64,
    /// Happiness below this shrinks the population.
    #[serde(default = "default_distress_threshold")]
    pub distress_threshold: f64,
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,
    #[serde(default = "default_decline_rate")]
    pub decline_rate: f64,
}

impl Default for PopulationRules {
    fn default() -> Self {
        Self {
            base_capacity: default_base_capacity(),
            growth_threshold: default_growth_threshold(),
            distress_threshold: default_distress_threshold(),
            growth_rate: default_growth_rate(),
            decline_rate: default_decline_rate(),
        }
    }
}

fn default_disaster_chance() -> f64 {
    0.05
}

fn default_min_damage() -> u8 {
    5
}

fn default_max_damage() -> u8 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterRules {
    /// Chance per settlement per disaster check.
    #[serde(default = "default_disaster_chance")]
    pub chance: f64,
    #[serde(default = "default_min_damage")]
    pub min_damage: u8,
    #[serde(default = "default_max_damage")]
    pub max_damage: u8,
}

impl Default for DisasterRules {
    fn default() -> Self {
        Self {
            chance: default_disaster_chance(),
            min_damage: default_min_damage(),
            max_damage: default_max_damage(),
        }
    }
}

fn default_passive_repair() -> u8 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairRules {
    /// Health restored per passive repair tick. Destroyed structures are not
    /// revived passively; they need an explicit repair action.
    #[serde(default = "default_passive_repair")]
    pub passive_amount: u8,
}

impl Default for RepairRules {
    fn default() -> Self {
        Self {
            passive_amount: default_passive_repair(),
        }
    }
}

fn default_world_multiplier() -> f64 {
    1.0
}

fn default_slots_per_tile() -> u8 {
    4
}

fn default_rates_ttl_secs() -> i64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "default_world_multiplier")]
    pub world_multiplier: f64,
    #[serde(default)]
    pub effectiveness: EffectivenessCurve,
    #[serde(default = "default_slots_per_tile")]
    pub slots_per_tile: u8,
    #[serde(default = "default_rates_ttl_secs")]
    pub rates_ttl_secs: i64,
    pub structures: BTreeMap<StructureKind, StructureDef>,
    /// Per-biome multipliers on production; resources absent from a biome's
    /// entry default to 1.0.
    #[serde(default)]
    pub biomes: BTreeMap<Biome, ResourceSet>,
    #[serde(default)]
    pub consumption: ConsumptionRates,
    #[serde(default)]
    pub population: PopulationRules,
    #[serde(default)]
    pub disaster: DisasterRules,
    #[serde(default)]
    pub repair: RepairRules,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no structure definition for '{}'", .0.display_name())]
    MissingDefinition(StructureKind),
    #[error("'{}' is an extractor but defines no production rates", .0.display_name())]
    ExtractorWithoutProduction(StructureKind),
    #[error("'{}' is a building but defines production rates", .0.display_name())]
    BuildingWithProduction(StructureKind),
    #[error("'{}' has max_level 0", .0.display_name())]
    ZeroMaxLevel(StructureKind),
    #[error(
        "'{}' requires '{}' which has no definition",
        .0.display_name(),
        .1.display_name()
    )]
    DanglingPrerequisite(StructureKind, StructureKind),
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let catalog: Catalog = serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// A missing definition is a configuration error, not a validation miss.
    pub fn definition(&self, kind: StructureKind) -> Result<&StructureDef, CatalogError> {
        self.structures
            .get(&kind)
            .ok_or(CatalogError::MissingDefinition(kind))
    }

    /// Multipliers for a biome, 1.0 per resource when the biome is unlisted.
    pub fn biome_multipliers(&self, biome: Biome) -> ResourceSet {
        self.biomes
            .get(&biome)
            .copied()
            .unwrap_or_else(|| ResourceSet::uniform(1.0))
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for (kind, def) in &self.structures {
            if def.max_level == 0 {
                return Err(CatalogError::ZeroMaxLevel(*kind));
            }
            match def.category {
                StructureCategory::Extractor if def.production.is_zero() => {
                    return Err(CatalogError::ExtractorWithoutProduction(*kind));
                }
                StructureCategory::Building if !def.production.is_zero() => {
                    return Err(CatalogError::BuildingWithProduction(*kind));
                }
                _ => {}
            }
            for prereq in &def.prerequisites {
                if !self.structures.contains_key(&prereq.structure) {
                    return Err(CatalogError::DanglingPrerequisite(*kind, prereq.structure));
                }
            }
        }
        Ok(())
    }

    /// The default balance set, used when no catalog file is supplied.
    pub fn builtin() -> Self {
        let mut structures = BTreeMap::new();

        let extractor = |kind, production: ResourceSet, build_cost: ResourceSet| StructureDef {
            kind,
            category: StructureCategory::Extractor,
            production,
            build_cost,
            max_level: 5,
            prerequisites: Vec::new(),
            modifiers: Vec::new(),
        };

        structures.insert(
            StructureKind::Farm,
            extractor(
                StructureKind::Farm,
                ResourceSet {
                    food: 10.0,
                    ..ResourceSet::default()
                },
                ResourceSet {
                    wood: 20.0,
                    ..ResourceSet::default()
                },
            ),
        );
        structures.insert(
            StructureKind::Well,
            extractor(
                StructureKind::Well,
                ResourceSet {
                    water: 10.0,
                    ..ResourceSet::default()
                },
                ResourceSet {
                    wood: 10.0,
                    stone: 10.0,
                    ..ResourceSet::default()
                },
            ),
        );
        structures.insert(
            StructureKind::LumberCamp,
            extractor(
                StructureKind::LumberCamp,
                ResourceSet {
                    wood: 8.0,
                    ..ResourceSet::default()
                },
                ResourceSet {
                    wood: 15.0,
                    ..ResourceSet::default()
                },
            ),
        );
        structures.insert(
            StructureKind::Quarry,
            StructureDef {
                prerequisites: vec![Prerequisite {
                    structure: StructureKind::TownHall,
                    min_level: 1,
                }],
                ..extractor(
                    StructureKind::Quarry,
                    ResourceSet {
                        stone: 6.0,
                        ..ResourceSet::default()
                    },
                    ResourceSet {
                        wood: 25.0,
                        ..ResourceSet::default()
                    },
                )
            },
        );
        structures.insert(
            StructureKind::Mine,
            StructureDef {
                prerequisites: vec![Prerequisite {
                    structure: StructureKind::Quarry,
                    min_level: 2,
                }],
                ..extractor(
                    StructureKind::Mine,
                    ResourceSet {
                        ore: 4.0,
                        ..ResourceSet::default()
                    },
                    ResourceSet {
                        wood: 30.0,
                        stone: 20.0,
                        ..ResourceSet::default()
                    },
                )
            },
        );

        structures.insert(
            StructureKind::TownHall,
            StructureDef {
                kind: StructureKind::TownHall,
                category: StructureCategory::Building,
                production: ResourceSet::default(),
                build_cost: ResourceSet {
                    wood: 50.0,
                    stone: 30.0,
                    ..ResourceSet::default()
                },
                max_level: 3,
                prerequisites: Vec::new(),
                modifiers: vec![
                    ModifierConfig {
                        kind: ModifierKind::PopulationCapacity,
                        formula: ScalingFormula::Linear,
                        base: 20.0,
                    },
                    ModifierConfig {
                        kind: ModifierKind::Happiness,
                        formula: ScalingFormula::Diminishing,
                        base: 5.0,
                    },
                ],
            },
        );
        structures.insert(
            StructureKind::House,
            StructureDef {
                kind: StructureKind::House,
                category: StructureCategory::Building,
                production: ResourceSet::default(),
                build_cost: ResourceSet {
                    wood: 15.0,
                    ..ResourceSet::default()
                },
                max_level: 5,
                prerequisites: Vec::new(),
                modifiers: vec![ModifierConfig {
                    kind: ModifierKind::PopulationCapacity,
                    formula: ScalingFormula::Linear,
                    base: 5.0,
                }],
            },
        );
        structures.insert(
            StructureKind::Granary,
            StructureDef {
                kind: StructureKind::Granary,
                category: StructureCategory::Building,
                production: ResourceSet::default(),
                build_cost: ResourceSet {
                    wood: 25.0,
                    stone: 10.0,
                    ..ResourceSet::default()
                },
                max_level: 4,
                prerequisites: vec![Prerequisite {
                    structure: StructureKind::TownHall,
                    min_level: 1,
                }],
                modifiers: vec![
                    ModifierConfig {
                        kind: ModifierKind::StorageCapacity,
                        formula: ScalingFormula::Exponential,
                        base: 100.0,
                    },
                    ModifierConfig {
                        kind: ModifierKind::FoodProduction,
                        formula: ScalingFormula::Linear,
                        base: 2.0,
                    },
                ],
            },
        );
        structures.insert(
            StructureKind::Tavern,
            StructureDef {
                kind: StructureKind::Tavern,
                category: StructureCategory::Building,
                production: ResourceSet::default(),
                build_cost: ResourceSet {
                    wood: 20.0,
                    stone: 5.0,
                    ..ResourceSet::default()
                },
                max_level: 3,
                prerequisites: vec![Prerequisite {
                    structure: StructureKind::House,
                    min_level: 1,
                }],
                modifiers: vec![ModifierConfig {
                    kind: ModifierKind::Happiness,
                    formula: ScalingFormula::Diminishing,
                    base: 8.0,
                }],
            },
        );

        let mut biomes = BTreeMap::new();
        biomes.insert(
            Biome::Forest,
            ResourceSet {
                food: 1.0,
                water: 1.0,
                wood: 1.25,
                stone: 0.9,
                ore: 0.9,
            },
        );
        biomes.insert(
            Biome::Mountains,
            ResourceSet {
                food: 0.75,
                water: 0.9,
                wood: 0.8,
                stone: 1.3,
                ore: 1.3,
            },
        );
        biomes.insert(
            Biome::Desert,
            ResourceSet {
                food: 0.5,
                water: 0.4,
                wood: 0.5,
                stone: 1.1,
                ore: 1.1,
            },
        );

        Self {
            world_multiplier: default_world_multiplier(),
            effectiveness: EffectivenessCurve::default(),
            slots_per_tile: default_slots_per_tile(),
            rates_ttl_secs: default_rates_ttl_secs(),
            structures,
            biomes,
            consumption: ConsumptionRates::default(),
            population: PopulationRules::default(),
            disaster: DisasterRules::default(),
            repair: RepairRules::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_validates() {
        let catalog = Catalog::builtin();
        catalog.validate().expect("builtin catalog is consistent");
        assert!(catalog.definition(StructureKind::Farm).is_ok());
    }

    #[test]
    fn missing_definition_is_a_loud_error() {
        let mut catalog = Catalog::builtin();
        catalog.structures.remove(&StructureKind::Mine);
        let err = catalog.definition(StructureKind::Mine).unwrap_err();
        assert!(matches!(err, CatalogError::MissingDefinition(StructureKind::Mine)));
    }

    #[test]
    fn unlisted_biome_multiplies_by_one() {
        let catalog = Catalog::builtin();
        let plains = catalog.biome_multipliers(Biome::Plains);
        assert_eq!(plains, ResourceSet::uniform(1.0));
    }

    #[test]
    fn dangling_prerequisite_fails_validation() {
        let mut catalog = Catalog::builtin();
        catalog.structures.remove(&StructureKind::TownHall);
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::DanglingPrerequisite(_, StructureKind::TownHall))
        ));
    }

    #[test]
    fn yaml_round_trip_preserves_defaults() {
        let catalog = Catalog::builtin();
        let text = serde_yaml::to_string(&catalog).unwrap();
        let reloaded: Catalog = serde_yaml::from_str(&text).unwrap();
        assert_eq!(reloaded.slots_per_tile, catalog.slots_per_tile);
        assert_eq!(reloaded.structures.len(), catalog.structures.len());
    }
}
