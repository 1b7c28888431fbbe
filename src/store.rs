//! Persistence seam. The engine writes one settlement document at a time; a
//! failed write must never corrupt the in-memory state, so callers persist
//! first and commit after.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::world::{Settlement, SettlementId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settlement store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settlement store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub trait SettlementStore: Send {
    fn save(&mut self, settlement: &Settlement) -> Result<(), StoreError>;
    fn load(&self, id: SettlementId) -> Result<Option<Settlement>, StoreError>;
}

/// One JSON document per settlement under a directory.
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, id: SettlementId) -> PathBuf {
        self.root.join(format!("settlement_{:06}.json", id.raw()))
    }
}

impl SettlementStore for JsonDirStore {
    fn save(&mut self, settlement: &Settlement) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(settlement)?;
        fs::write(self.path_for(settlement.id), data)?;
        Ok(())
    }

    fn load(&self, id: SettlementId) -> Result<Option<Settlement>, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

/// Discards everything; used when running without persistence.
pub struct NullStore;

impl SettlementStore for NullStore {
    fn save(&mut self, _settlement: &Settlement) -> Result<(), StoreError> {
        Ok(())
    }

    fn load(&self, _id: SettlementId) -> Result<Option<Settlement>, StoreError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{PopulationState, ResourceStorage};

    fn settlement(id: u64) -> Settlement {
        Settlement {
            id: SettlementId(id),
            name: format!("settlement-{id}"),
            structures: Vec::new(),
            storage: ResourceStorage::default(),
            population: PopulationState {
                current: 42,
                happiness: 61.5,
                last_growth_at: None,
            },
            modifier_totals: Default::default(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonDirStore::new(dir.path()).unwrap();
        store.save(&settlement(7)).unwrap();

        let loaded = store.load(SettlementId(7)).unwrap().expect("document exists");
        assert_eq!(loaded.name, "settlement-7");
        assert_eq!(loaded.population.current, 42);
    }

    #[test]
    fn loading_an_unknown_settlement_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path()).unwrap();
        assert!(store.load(SettlementId(99)).unwrap().is_none());
    }
}
