//! Settlement modifier aggregation: per-structure modifier rows are
//! deduplicated and summed into settlement-wide totals. Totals are a cache,
//! recomputed in full on every structure mutation.

use std::collections::{BTreeMap, HashSet};

use crate::calc::modifier::modifier_value;
use crate::catalog::{Catalog, CatalogError, ModifierKind};
use crate::world::{Settlement, StructureId};

pub type ModifierTotals = BTreeMap<ModifierKind, f64>;

/// One modifier contribution from one structure instance. Upstream sources
/// can fan these out with duplicates; aggregation must not double-count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModifierRow {
    pub structure: StructureId,
    pub kind: ModifierKind,
    pub value: f64,
}

/// Sums rows per modifier kind, ignoring repeats of the same
/// (structure, kind, value) triple.
pub fn aggregate_rows(rows: &[ModifierRow]) -> ModifierTotals {
    let mut seen: HashSet<(u64, ModifierKind, u64)> = HashSet::new();
    let mut totals = ModifierTotals::new();
    for row in rows {
        if seen.insert((row.structure.raw(), row.kind, row.value.to_bits())) {
            *totals.entry(row.kind).or_insert(0.0) += row.value;
        }
    }
    totals
}

/// Evaluates every structure's modifier configs at its current level.
/// Destroyed structures contribute nothing.
pub fn settlement_rows(
    settlement: &Settlement,
    catalog: &Catalog,
) -> Result<Vec<ModifierRow>, CatalogError> {
    let mut rows = Vec::new();
    for structure in &settlement.structures {
        if structure.is_destroyed() {
            continue;
        }
        let def = catalog.definition(structure.kind)?;
        for config in &def.modifiers {
            match modifier_value(config, structure.level) {
                Ok(value) => rows.push(ModifierRow {
                    structure: structure.id,
                    kind: config.kind,
                    value,
                }),
                Err(err) => {
                    tracing::warn!(
                        structure = structure.id.raw(),
                        %err,
                        "skipping modifier with invalid level"
                    );
                }
            }
        }
    }
    Ok(rows)
}

pub fn recompute(settlement: &Settlement, catalog: &Catalog) -> Result<ModifierTotals, CatalogError> {
    Ok(aggregate_rows(&settlement_rows(settlement, catalog)?))
}

pub fn total(totals: &ModifierTotals, kind: ModifierKind) -> f64 {
    totals.get(&kind).copied().unwrap_or(0.0)
}
