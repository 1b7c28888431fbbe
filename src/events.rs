//! Result payloads emitted after each settlement batch, for the realtime
//! transport to forward to connected clients.

use serde::Serialize;

use crate::calc::population::{HappinessBand, SizeTier};
use crate::catalog::StructureKind;
use crate::resources::ResourceSet;

#[derive(Debug, Clone, Serialize)]
pub struct ProductionUpdate {
    pub settlement_id: u64,
    pub production: ResourceSet,
    pub consumption: ResourceSet,
    pub net: ResourceSet,
    pub waste: ResourceSet,
    /// True while base rates come from the fallback instead of a fresh
    /// configuration fetch.
    pub degraded_rates: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulationUpdate {
    pub settlement_id: u64,
    pub current: u64,
    pub capacity: u64,
    pub happiness: f64,
    pub band: HappinessBand,
    pub tier: SizeTier,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisasterReport {
    pub settlement_id: u64,
    pub structure_id: u64,
    pub kind: StructureKind,
    pub damage: u8,
    pub health_after: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub settlement_id: u64,
    pub structures_repaired: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    Production(ProductionUpdate),
    Population(PopulationUpdate),
    Disaster(DisasterReport),
    Repair(RepairReport),
}

impl EngineEvent {
    pub fn settlement_id(&self) -> u64 {
        match self {
            EngineEvent::Production(update) => update.settlement_id,
            EngineEvent::Population(update) => update.settlement_id,
            EngineEvent::Disaster(report) => report.settlement_id,
            EngineEvent::Repair(report) => report.settlement_id,
        }
    }
}
