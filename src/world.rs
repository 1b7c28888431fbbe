//! Settlement world state: settlements, structures, tiles, storage,
//! population. Tiles are read-only inputs owned by world generation; the
//! engine only ever reads their quality and biome.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Biome, StructureKind};
use crate::modifiers::ModifierTotals;
use crate::resources::{ResourceKind, ResourceSet};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SettlementId(pub u64);

impl SettlementId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StructureId(pub u64);

impl StructureId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TileId(pub u64);

impl TileId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

pub const MAX_HEALTH: u8 = 100;

/// World-generation output the engine consumes. Quality is 0-100 per
/// resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub biome: Biome,
    pub x: i32,
    pub y: i32,
    pub quality: ResourceSet,
}

/// A placed structure instance. Health only ever changes through
/// `apply_damage` and `apply_repair`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementStructure {
    pub id: StructureId,
    pub kind: StructureKind,
    pub level: u32,
    pub health: u8,
    /// Extractors are bound to a tile slot; buildings have neither.
    pub tile: Option<TileId>,
    pub slot: Option<u8>,
    pub damaged_at: Option<DateTime<Utc>>,
    pub last_repaired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SettlementStructure {
    pub fn new(
        id: StructureId,
        kind: StructureKind,
        tile: Option<TileId>,
        slot: Option<u8>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            level: 1,
            health: MAX_HEALTH,
            tile,
            slot,
            damaged_at: None,
            last_repaired_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.health == 0
    }

    pub fn is_damaged(&self) -> bool {
        self.health < MAX_HEALTH
    }

    pub fn apply_damage(&mut self, amount: u8, at: DateTime<Utc>) {
        self.health = self.health.saturating_sub(amount);
        self.damaged_at = Some(at);
        self.updated_at = at;
    }

    pub fn apply_repair(&mut self, amount: u8, at: DateTime<Utc>) {
        self.health = self.health.saturating_add(amount).min(MAX_HEALTH);
        self.last_repaired_at = Some(at);
        self.updated_at = at;
    }
}

/// Per-resource stock with capacity. Overflow past capacity is discarded and
/// tallied as waste, never stored or rolled over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceStorage {
    pub current: ResourceSet,
    pub capacity: ResourceSet,
    pub wasted: ResourceSet,
}

impl ResourceStorage {
    /// Applies a net delta, clamping each resource into [0, capacity + bonus]
    /// and recording the clipped overflow. Returns the waste for this apply.
    pub fn apply_net(&mut self, net: &ResourceSet, capacity_bonus: f64) -> ResourceSet {
        let mut waste = ResourceSet::default();
        for kind in ResourceKind::ALL {
            let cap = (self.capacity.get(kind) + capacity_bonus).max(0.0);
            let next = self.current.get(kind) + net.get(kind);
            if next > cap {
                waste.set(kind, next - cap);
                self.current.set(kind, cap);
            } else {
                self.current.set(kind, next.max(0.0));
            }
        }
        self.wasted.add(&waste);
        waste
    }

    /// First resource the stock cannot cover, if any.
    pub fn first_shortfall(&self, cost: &ResourceSet) -> Option<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .find(|&kind| self.current.get(kind) < cost.get(kind))
    }

    pub fn withdraw(&mut self, cost: &ResourceSet) {
        self.current.sub(cost);
        self.current.clamp_non_negative();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationState {
    pub current: u64,
    pub happiness: f64,
    pub last_growth_at: Option<DateTime<Utc>>,
}

impl Default for PopulationState {
    fn default() -> Self {
        Self {
            current: 0,
            happiness: 50.0,
            last_growth_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub name: String,
    pub structures: Vec<SettlementStructure>,
    pub storage: ResourceStorage,
    pub population: PopulationState,
    /// Cache of aggregated modifier totals; recomputed on every structure
    /// mutation, never patched incrementally.
    #[serde(default)]
    pub modifier_totals: ModifierTotals,
}

impl Settlement {
    pub fn structure(&self, id: StructureId) -> Option<&SettlementStructure> {
        self.structures.iter().find(|s| s.id == id)
    }

    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut SettlementStructure> {
        self.structures.iter_mut().find(|s| s.id == id)
    }

    /// Highest level among instances of a kind, `None` when absent. Absent is
    /// not level zero: a structure cannot exist at level 0.
    pub fn level_of(&self, kind: StructureKind) -> Option<u32> {
        self.structures
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.level)
            .max()
    }

    pub fn slot_occupied(&self, tile: TileId, slot: u8) -> bool {
        self.structures
            .iter()
            .any(|s| s.tile == Some(tile) && s.slot == Some(slot))
    }

    /// Standing (non-destroyed) structures, the basis for upkeep.
    pub fn standing_count(&self) -> usize {
        self.structures.iter().filter(|s| !s.is_destroyed()).count()
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct WorldState {
    next_structure: u64,
    settlements: BTreeMap<SettlementId, Settlement>,
    tiles: BTreeMap<TileId, Tile>,
}

impl WorldState {
    pub fn insert_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.id, tile);
    }

    pub fn insert_settlement(&mut self, settlement: Settlement) {
        self.settlements.insert(settlement.id, settlement);
    }

    pub fn allocate_structure_id(&mut self) -> StructureId {
        let id = StructureId(self.next_structure);
        self.next_structure += 1;
        id
    }

    pub fn settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.settlements.get(&id)
    }

    pub fn settlement_mut(&mut self, id: SettlementId) -> Option<&mut Settlement> {
        self.settlements.get_mut(&id)
    }

    pub fn settlement_ids(&self) -> Vec<SettlementId> {
        self.settlements.keys().copied().collect()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn tiles(&self) -> &BTreeMap<TileId, Tile> {
        &self.tiles
    }

    pub fn total_population(&self) -> u64 {
        self.settlements.values().map(|s| s.population.current).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure() -> SettlementStructure {
        SettlementStructure::new(
            StructureId(1),
            StructureKind::Farm,
            Some(TileId(1)),
            Some(0),
            Utc::now(),
        )
    }

    #[test]
    fn damage_floors_at_zero_and_records_timestamp() {
        let mut s = structure();
        let at = Utc::now();
        s.apply_damage(150, at);
        assert_eq!(s.health, 0);
        assert!(s.is_destroyed());
        assert_eq!(s.damaged_at, Some(at));
    }

    #[test]
    fn repair_caps_at_max_health() {
        let mut s = structure();
        s.apply_damage(30, Utc::now());
        s.apply_repair(200, Utc::now());
        assert_eq!(s.health, MAX_HEALTH);
        assert!(s.last_repaired_at.is_some());
    }

    #[test]
    fn overflow_is_wasted_not_stored() {
        let mut storage = ResourceStorage {
            current: ResourceSet {
                food: 90.0,
                ..ResourceSet::default()
            },
            capacity: ResourceSet::uniform(100.0),
            wasted: ResourceSet::default(),
        };
        let waste = storage.apply_net(
            &ResourceSet {
                food: 25.0,
                ..ResourceSet::default()
            },
            0.0,
        );
        assert_eq!(storage.current.food, 100.0);
        assert_eq!(waste.food, 15.0);
        assert_eq!(storage.wasted.food, 15.0);
    }

    #[test]
    fn net_deficit_clamps_at_zero() {
        let mut storage = ResourceStorage {
            current: ResourceSet {
                water: 2.0,
                ..ResourceSet::default()
            },
            capacity: ResourceSet::uniform(100.0),
            wasted: ResourceSet::default(),
        };
        storage.apply_net(
            &ResourceSet {
                water: -5.0,
                ..ResourceSet::default()
            },
            0.0,
        );
        assert_eq!(storage.current.water, 0.0);
    }

    #[test]
    fn absent_structure_has_no_level() {
        let settlement = Settlement {
            id: SettlementId(1),
            name: "empty".into(),
            structures: Vec::new(),
            storage: ResourceStorage::default(),
            population: PopulationState::default(),
            modifier_totals: ModifierTotals::default(),
        };
        assert_eq!(settlement.level_of(StructureKind::TownHall), None);
    }
}
