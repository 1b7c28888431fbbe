//! Build, upgrade, repair, demolish, and collect handlers. Each is a
//! synchronous request/response: validate everything, then mutate atomically,
//! then recompute modifier totals and return the refreshed view. A rejection
//! leaves the settlement untouched.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::calc::population;
use crate::catalog::{Catalog, CatalogError, StructureKind};
use crate::events::PopulationUpdate;
use crate::modifiers::{self, ModifierTotals};
use crate::prereq::{self, MissingPrerequisite};
use crate::resources::{ResourceKind, ResourceSet};
use crate::world::{
    Settlement, SettlementId, SettlementStructure, StructureId, TileId, WorldState,
};

/// A domain rejection: the request was understood but cannot be applied.
#[derive(Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("unknown settlement {0:?}")]
    UnknownSettlement(SettlementId),
    #[error("unknown structure {0:?}")]
    UnknownStructure(StructureId),
    #[error("unknown tile {0:?}")]
    UnknownTile(TileId),
    #[error("prerequisites not met")]
    Prerequisites { missing: Vec<MissingPrerequisite> },
    #[error("insufficient {resource:?}: need {required}, have {available}")]
    InsufficientResources {
        resource: ResourceKind,
        required: f64,
        available: f64,
    },
    #[error("slot {slot} on tile {tile:?} is occupied")]
    SlotOccupied { tile: TileId, slot: u8 },
    #[error("slot {slot} is out of range (tiles have {total} slots)")]
    SlotOutOfRange { slot: u8, total: u8 },
    #[error("extractors must be placed on a tile slot")]
    ExtractorNeedsTile(StructureKind),
    #[error("'{}' is already at max level {level}", .kind.display_name())]
    MaxLevel { kind: StructureKind, level: u32 },
    #[error("repair amount must be greater than zero")]
    ZeroRepair,
}

#[derive(Debug, Error)]
pub enum ActionError {
    /// Configuration problem: fatal for the operation, never silently zeroed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Normal domain rejection, reported back to the caller.
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub settlement: SettlementId,
    pub kind: StructureKind,
    pub tile: Option<TileId>,
    pub slot: Option<u8>,
}

/// Refreshed settlement view returned from every mutation.
#[derive(Debug, Clone)]
pub struct StructureReceipt {
    pub structure: StructureId,
    pub totals: ModifierTotals,
    pub population: PopulationUpdate,
}

#[derive(Debug, Clone)]
pub struct CollectReceipt {
    pub collected: ResourceSet,
    pub remaining: ResourceSet,
}

fn population_view(settlement: &Settlement, catalog: &Catalog) -> PopulationUpdate {
    let capacity = population::capacity(&catalog.population, &settlement.modifier_totals);
    let happiness = settlement.population.happiness;
    PopulationUpdate {
        settlement_id: settlement.id.raw(),
        current: settlement.population.current,
        capacity,
        happiness,
        band: population::band(happiness),
        tier: population::tier(settlement.population.current),
        growth_rate: population::growth_rate(
            happiness,
            settlement.population.current,
            capacity,
            &catalog.population,
        ),
    }
}

fn settlement_ref(world: &WorldState, id: SettlementId) -> Result<&Settlement, Rejection> {
    world.settlement(id).ok_or(Rejection::UnknownSettlement(id))
}

fn check_cost(settlement: &Settlement, cost: &ResourceSet) -> Result<(), Rejection> {
    if let Some(resource) = settlement.storage.first_shortfall(cost) {
        return Err(Rejection::InsufficientResources {
            resource,
            required: cost.get(resource),
            available: settlement.storage.current.get(resource),
        });
    }
    Ok(())
}

fn commit(
    world: &mut WorldState,
    updated: Settlement,
    catalog: &Catalog,
    structure: StructureId,
) -> Result<StructureReceipt, ActionError> {
    let mut updated = updated;
    updated.modifier_totals = modifiers::recompute(&updated, catalog)?;
    let receipt = StructureReceipt {
        structure,
        totals: updated.modifier_totals.clone(),
        population: population_view(&updated, catalog),
    };
    let id = updated.id;
    if let Some(slot) = world.settlement_mut(id) {
        *slot = updated;
    }
    Ok(receipt)
}

pub fn build(
    world: &mut WorldState,
    catalog: &Catalog,
    now: DateTime<Utc>,
    request: &BuildRequest,
) -> Result<StructureReceipt, ActionError> {
    let def = catalog.definition(request.kind)?;
    let settlement = settlement_ref(world, request.settlement)?;

    let report = prereq::validate(request.kind, settlement, catalog)?;
    if !report.is_valid {
        return Err(Rejection::Prerequisites {
            missing: report.missing,
        }
        .into());
    }

    let (tile, slot) = if def.is_extractor() {
        let tile = request
            .tile
            .ok_or(Rejection::ExtractorNeedsTile(request.kind))?;
        let slot = request
            .slot
            .ok_or(Rejection::ExtractorNeedsTile(request.kind))?;
        if world.tile(tile).is_none() {
            // Placement needs a known tile even though production would fall
            // back to default quality.
            return Err(Rejection::UnknownTile(tile).into());
        }
        if slot >= catalog.slots_per_tile {
            return Err(Rejection::SlotOutOfRange {
                slot,
                total: catalog.slots_per_tile,
            }
            .into());
        }
        if settlement.slot_occupied(tile, slot) {
            return Err(Rejection::SlotOccupied { tile, slot }.into());
        }
        (Some(tile), Some(slot))
    } else {
        (None, None)
    };

    check_cost(settlement, &def.build_cost)?;

    let mut updated = settlement.clone();
    let cost = def.build_cost;
    let id = world.allocate_structure_id();
    updated.storage.withdraw(&cost);
    updated
        .structures
        .push(SettlementStructure::new(id, request.kind, tile, slot, now));
    commit(world, updated, catalog, id)
}

pub fn upgrade(
    world: &mut WorldState,
    catalog: &Catalog,
    now: DateTime<Utc>,
    settlement_id: SettlementId,
    structure_id: StructureId,
) -> Result<StructureReceipt, ActionError> {
    let settlement = settlement_ref(world, settlement_id)?;
    let structure = settlement
        .structure(structure_id)
        .ok_or(Rejection::UnknownStructure(structure_id))?;
    let def = catalog.definition(structure.kind)?;

    if structure.level >= def.max_level {
        return Err(Rejection::MaxLevel {
            kind: structure.kind,
            level: structure.level,
        }
        .into());
    }

    let report = prereq::validate(structure.kind, settlement, catalog)?;
    if !report.is_valid {
        return Err(Rejection::Prerequisites {
            missing: report.missing,
        }
        .into());
    }

    // Upgrade cost scales linearly with the target level.
    let next_level = structure.level + 1;
    let mut cost = def.build_cost;
    for kind in ResourceKind::ALL {
        cost.set(kind, cost.get(kind) * f64::from(next_level));
    }
    check_cost(settlement, &cost)?;

    let mut updated = settlement.clone();
    updated.storage.withdraw(&cost);
    if let Some(target) = updated.structure_mut(structure_id) {
        target.level = next_level;
        target.updated_at = now;
    }
    commit(world, updated, catalog, structure_id)
}

pub fn repair(
    world: &mut WorldState,
    catalog: &Catalog,
    now: DateTime<Utc>,
    settlement_id: SettlementId,
    structure_id: StructureId,
    amount: u8,
) -> Result<StructureReceipt, ActionError> {
    if amount == 0 {
        return Err(Rejection::ZeroRepair.into());
    }
    let settlement = settlement_ref(world, settlement_id)?;
    if settlement.structure(structure_id).is_none() {
        return Err(Rejection::UnknownStructure(structure_id).into());
    }

    let mut updated = settlement.clone();
    if let Some(target) = updated.structure_mut(structure_id) {
        target.apply_repair(amount, now);
    }
    commit(world, updated, catalog, structure_id)
}

pub fn demolish(
    world: &mut WorldState,
    catalog: &Catalog,
    settlement_id: SettlementId,
    structure_id: StructureId,
) -> Result<StructureReceipt, ActionError> {
    let settlement = settlement_ref(world, settlement_id)?;
    if settlement.structure(structure_id).is_none() {
        return Err(Rejection::UnknownStructure(structure_id).into());
    }

    let mut updated = settlement.clone();
    updated.structures.retain(|s| s.id != structure_id);
    commit(world, updated, catalog, structure_id)
}

/// Manual collection withdraws from storage through the same serialized
/// write path the production tick uses.
pub fn collect(
    world: &mut WorldState,
    settlement_id: SettlementId,
    amounts: &ResourceSet,
) -> Result<CollectReceipt, ActionError> {
    let settlement = settlement_ref(world, settlement_id)?;
    check_cost(settlement, amounts)?;

    let mut updated = settlement.clone();
    updated.storage.withdraw(amounts);
    let remaining = updated.storage.current;
    if let Some(slot) = world.settlement_mut(settlement_id) {
        *slot = updated;
    }
    Ok(CollectReceipt {
        collected: *amounts,
        remaining,
    })
}
