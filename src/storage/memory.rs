//! In-memory record store for tests and dry runs.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::{Record, RecordStore, StorageError};
use crate::models::{EntityId, EntityKind};

/// Records kept as JSON values, so they go through the same serde path as
/// the file-backed store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: HashMap<EntityKind, BTreeMap<EntityId, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.records.get(&kind).map_or(0, BTreeMap::len)
    }
}

impl RecordStore for InMemoryStore {
    fn load_all<T: Record>(&self) -> Result<Vec<T>, StorageError> {
        let Some(values) = self.records.get(&T::KIND) else {
            return Ok(Vec::new());
        };
        values
            .values()
            .map(|value| serde_json::from_value(value.clone()).map_err(StorageError::from))
            .collect()
    }

    fn save_all<T: Record>(&mut self, records: &[T]) -> Result<(), StorageError> {
        let values = self.records.entry(T::KIND).or_default();
        for record in records {
            values.insert(record.id(), serde_json::to_value(record)?);
        }
        Ok(())
    }

    fn ids(&self, kind: EntityKind) -> Result<Vec<EntityId>, StorageError> {
        Ok(self
            .records
            .get(&kind)
            .map(|values| values.keys().copied().collect())
            .unwrap_or_default())
    }
}
