//! Scenario files describe the starting world: tiles, settlements, placed
//! structures. YAML via serde, validated against the catalog at build time.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::catalog::{Biome, Catalog, StructureKind};
use crate::modifiers;
use crate::resources::{ResourceKind, ResourceSet};
use crate::world::{
    PopulationState, ResourceStorage, Settlement, SettlementId, SettlementStructure, Tile, TileId,
    WorldState, MAX_HEALTH,
};

fn default_quality() -> ResourceSet {
    ResourceSet::uniform(50.0)
}

fn default_capacity() -> ResourceSet {
    ResourceSet::uniform(1000.0)
}

fn default_happiness() -> f64 {
    50.0
}

fn default_level() -> u32 {
    1
}

fn default_health() -> u8 {
    MAX_HEALTH
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub tiles: Vec<ScenarioTile>,
    pub settlements: Vec<ScenarioSettlement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTile {
    pub id: u64,
    pub biome: Biome,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default = "default_quality")]
    pub quality: ResourceSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSettlement {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub population: u64,
    #[serde(default = "default_happiness")]
    pub happiness: f64,
    #[serde(default)]
    pub storage: ScenarioStorage,
    #[serde(default)]
    pub structures: Vec<ScenarioStructure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioStorage {
    #[serde(default)]
    pub current: ResourceSet,
    #[serde(default = "default_capacity")]
    pub capacity: ResourceSet,
}

impl Default for ScenarioStorage {
    fn default() -> Self {
        Self {
            current: ResourceSet::default(),
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioStructure {
    pub kind: StructureKind,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default = "default_health")]
    pub health: u8,
    #[serde(default)]
    pub tile: Option<u64>,
    #[serde(default)]
    pub slot: Option<u8>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_world(&self, catalog: &Catalog) -> Result<WorldState> {
        let mut world = WorldState::default();

        for tile in &self.tiles {
            let id = TileId(tile.id);
            if world.tile(id).is_some() {
                bail!("tile id {} defined more than once", tile.id);
            }
            for kind in ResourceKind::ALL {
                let quality = tile.quality.get(kind);
                if !(0.0..=100.0).contains(&quality) {
                    bail!(
                        "tile {} has {} quality {} outside 0-100",
                        tile.id,
                        kind.name(),
                        quality
                    );
                }
            }
            world.insert_tile(Tile {
                id,
                biome: tile.biome,
                x: tile.x,
                y: tile.y,
                quality: tile.quality,
            });
        }

        let now = Utc::now();
        for entry in &self.settlements {
            let id = SettlementId(entry.id);
            if world.settlement(id).is_some() {
                bail!("settlement id {} defined more than once", entry.id);
            }

            let mut structures = Vec::with_capacity(entry.structures.len());
            for placed in &entry.structures {
                let def = catalog.definition(placed.kind)?;
                if placed.level < 1 || placed.level > def.max_level {
                    bail!(
                        "'{}' in {} has level {} outside 1-{}",
                        placed.kind.display_name(),
                        entry.name,
                        placed.level,
                        def.max_level
                    );
                }
                if placed.health > MAX_HEALTH {
                    bail!(
                        "'{}' in {} has health {} above {}",
                        placed.kind.display_name(),
                        entry.name,
                        placed.health,
                        MAX_HEALTH
                    );
                }
                let tile = placed.tile.map(TileId);
                if def.is_extractor() {
                    let (Some(tile_id), Some(slot)) = (tile, placed.slot) else {
                        bail!(
                            "extractor '{}' in {} needs a tile and slot",
                            placed.kind.display_name(),
                            entry.name
                        );
                    };
                    if world.tile(tile_id).is_none() {
                        bail!(
                            "'{}' in {} references unknown tile {}",
                            placed.kind.display_name(),
                            entry.name,
                            tile_id.raw()
                        );
                    }
                    if slot >= catalog.slots_per_tile {
                        bail!(
                            "'{}' in {} uses slot {} but tiles have {} slots",
                            placed.kind.display_name(),
                            entry.name,
                            slot,
                            catalog.slots_per_tile
                        );
                    }
                    let collision = structures.iter().any(|s: &SettlementStructure| {
                        s.tile == Some(tile_id) && s.slot == Some(slot)
                    });
                    if collision {
                        bail!(
                            "slot {} on tile {} in {} is assigned twice",
                            slot,
                            tile_id.raw(),
                            entry.name
                        );
                    }
                }

                let mut structure = SettlementStructure::new(
                    world.allocate_structure_id(),
                    placed.kind,
                    tile,
                    placed.slot,
                    now,
                );
                structure.level = placed.level;
                structure.health = placed.health;
                structures.push(structure);
            }

            let mut settlement = Settlement {
                id,
                name: entry.name.clone(),
                structures,
                storage: ResourceStorage {
                    current: entry.storage.current,
                    capacity: entry.storage.capacity,
                    wasted: ResourceSet::default(),
                },
                population: PopulationState {
                    current: entry.population,
                    happiness: entry.happiness.clamp(0.0, 100.0),
                    last_growth_at: None,
                },
                modifier_totals: Default::default(),
            };
            settlement.modifier_totals = modifiers::recompute(&settlement, catalog)?;
            world.insert_settlement(settlement);
        }

        if world.settlement_ids().is_empty() {
            bail!("scenario must define at least one settlement");
        }
        Ok(world)
    }
}
