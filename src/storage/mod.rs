//! Flat-file record storage.
//!
//! Every entity kind lives in its own JSONL file under the data directory:
//! - `players.jsonl`
//! - `matches.jsonl`
//! - `rounds.jsonl`
//! - `tournaments.jsonl`
//!
//! Saves overwrite whole records and rewrite the file atomically.

mod jsonl;
mod memory;
mod records;

pub use jsonl::*;
pub use memory::*;
pub use records::*;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::models::{EntityId, EntityKind, Match, Player, SequentialIds, TournamentError};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: EntityId },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Domain(#[from] TournamentError),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// File holding all records of `kind`.
    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.data_dir.join(filename(kind))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Get the filename for an entity kind.
pub fn filename(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Player => "players.jsonl",
        EntityKind::Match => "matches.jsonl",
        EntityKind::Round => "rounds.jsonl",
        EntityKind::Tournament => "tournaments.jsonl",
    }
}

/// A persisted entity, keyed by its ID.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;
}

impl Record for Player {
    const KIND: EntityKind = EntityKind::Player;

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Record for Match {
    const KIND: EntityKind = EntityKind::Match;

    fn id(&self) -> EntityId {
        Match::id(self)
    }
}

/// Repository of records, one collection per entity kind.
pub trait RecordStore {
    /// All records of one kind.
    fn load_all<T: Record>(&self) -> Result<Vec<T>, StorageError>;

    /// Insert or overwrite records, matching on ID.
    fn save_all<T: Record>(&mut self, records: &[T]) -> Result<(), StorageError>;

    /// IDs of every stored record of `kind`.
    fn ids(&self, kind: EntityKind) -> Result<Vec<EntityId>, StorageError>;

    fn load<T: Record>(&self, id: EntityId) -> Result<T, StorageError> {
        self.load_all::<T>()?
            .into_iter()
            .find(|record| record.id() == id)
            .ok_or(StorageError::NotFound { kind: T::KIND, id })
    }

    fn save<T: Record>(&mut self, record: &T) -> Result<(), StorageError> {
        self.save_all(std::slice::from_ref(record))
    }

    /// Next free ID for `kind`: highest stored number plus one.
    fn next_id(&self, kind: EntityKind) -> Result<EntityId, StorageError> {
        let max = self
            .ids(kind)?
            .iter()
            .map(EntityId::number)
            .max()
            .unwrap_or(0);
        Ok(EntityId::new(kind, max + 1)?)
    }

    /// An allocator continuing after every stored ID.
    fn id_allocator(&self) -> Result<SequentialIds, StorageError> {
        let mut next = BTreeMap::new();
        for kind in EntityKind::ALL {
            next.insert(kind, self.next_id(kind)?.number());
        }
        Ok(SequentialIds::starting_at(next))
    }
}
