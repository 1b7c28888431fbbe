//! Prerequisite validation for building and upgrading structures.

use serde::Serialize;

use crate::catalog::{Catalog, CatalogError, StructureKind};
use crate::world::Settlement;

/// One unmet prerequisite. `current_level` is `None` when the required
/// structure is absent entirely, which is distinct from existing at a low
/// level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingPrerequisite {
    pub structure: StructureKind,
    pub required_level: u32,
    pub current_level: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrereqReport {
    pub is_valid: bool,
    pub missing: Vec<MissingPrerequisite>,
}

/// Checks every prerequisite of `kind` against the settlement's current
/// structures. A structure type with no prerequisites is always valid. A
/// prerequisite whose *definition* is missing from the catalog is a
/// configuration error, not a validation miss.
pub fn validate(
    kind: StructureKind,
    settlement: &Settlement,
    catalog: &Catalog,
) -> Result<PrereqReport, CatalogError> {
    let def = catalog.definition(kind)?;
    let mut missing = Vec::new();
    for prereq in &def.prerequisites {
        // Resolve the required definition so a broken catalog fails loudly.
        catalog.definition(prereq.structure)?;
        let current = settlement.level_of(prereq.structure);
        let satisfied = current.is_some_and(|level| level >= prereq.min_level);
        if !satisfied {
            missing.push(MissingPrerequisite {
                structure: prereq.structure,
                required_level: prereq.min_level,
                current_level: current,
            });
        }
    }
    Ok(PrereqReport {
        is_valid: missing.is_empty(),
        missing,
    })
}
