//! JSONL (JSON Lines) storage.
//!
//! JSONL is the source of truth for all records.
//! Each line is a valid JSON object representing one entity.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Record, RecordStore, StorageConfig, StorageError};
use crate::models::{EntityId, EntityKind};

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write entities, replacing the entire file.
    ///
    /// Lines go to a sibling temp file which is then renamed over the target,
    /// so readers never observe a half-written file.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let temp = self.temp_path();
        let file = File::create(&temp)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(&temp, &self.path)?;

        debug!("Wrote {} entities to {:?}", count, self.path);
        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities from the file, skipping lines that fail to parse.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(entity) => entities.push(entity),
                Err(e) => {
                    warn!(
                        "Failed to parse line {} in {:?}: {}",
                        index + 1,
                        self.path,
                        e
                    );
                }
            }
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }
}

fn value_id(value: &Value) -> Option<EntityId> {
    value.get("id")?.as_str()?.parse().ok()
}

/// Record store backed by one JSONL file per entity kind.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    config: StorageConfig,
}

impl JsonlStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn read_values(&self, kind: EntityKind) -> Result<Vec<Value>, StorageError> {
        JsonlReader::<Value>::new(self.config.path_for(kind)).read_all()
    }
}

impl RecordStore for JsonlStore {
    fn load_all<T: Record>(&self) -> Result<Vec<T>, StorageError> {
        JsonlReader::new(self.config.path_for(T::KIND)).read_all()
    }

    fn save_all<T: Record>(&mut self, records: &[T]) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut values = self.read_values(T::KIND)?;
        for record in records {
            let value = serde_json::to_value(record)?;
            let id = record.id();
            match values.iter_mut().find(|v| value_id(v) == Some(id)) {
                Some(existing) => *existing = value,
                None => values.push(value),
            }
        }

        JsonlWriter::new(self.config.path_for(T::KIND)).write_all(&values)?;
        debug!(kind = %T::KIND, count = records.len(), "Saved records");
        Ok(())
    }

    fn ids(&self, kind: EntityKind) -> Result<Vec<EntityId>, StorageError> {
        Ok(self.read_values(kind)?.iter().filter_map(value_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Player;
    use chrono::NaiveDate;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestEntity {
        id: String,
        name: String,
        value: u32,
    }

    fn test_store(temp_dir: &TempDir) -> JsonlStore {
        JsonlStore::new(StorageConfig::new(temp_dir.path().to_path_buf()))
    }

    fn player(n: u32, last_name: &str) -> Player {
        Player::new(
            EntityId::player(n).unwrap(),
            last_name,
            "Test",
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            &format!("AB{:05}", n),
        )
        .unwrap()
    }

    #[test]
    fn test_jsonl_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");

        let entities = vec![
            TestEntity {
                id: "1".to_string(),
                name: "First".to_string(),
                value: 100,
            },
            TestEntity {
                id: "2".to_string(),
                name: "Second".to_string(),
                value: 200,
            },
        ];

        let writer: JsonlWriter<TestEntity> = JsonlWriter::new(path.clone());
        let count = writer.write_all(&entities).unwrap();
        assert_eq!(count, 2);

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        let read_entities = reader.read_all().unwrap();

        assert_eq!(read_entities, entities);
    }

    #[test]
    fn test_write_all_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("atomic.jsonl");

        let writer: JsonlWriter<TestEntity> = JsonlWriter::new(path.clone());
        writer.write_all(&[]).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join("atomic.jsonl.tmp").exists());
    }

    #[test]
    fn test_jsonl_read_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.jsonl");

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        assert!(!reader.exists());
        assert!(reader.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_read_all_skips_bad_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad_lines.jsonl");

        std::fs::write(
            &path,
            r#"{"id":"1","name":"Good","value":1}
not-valid-json

{"id":"2","name":"Also Good","value":2}
"#,
        )
        .unwrap();

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        let entities = reader.read_all().unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].name, "Good");
        assert_eq!(entities[1].name, "Also Good");
    }

    #[test]
    fn test_store_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        store.save(&player(1, "Carlsen")).unwrap();
        store.save(&player(2, "Polgar")).unwrap();

        let loaded: Player = store.load(EntityId::player(2).unwrap()).unwrap();
        assert_eq!(loaded.last_name, "Polgar");
        assert!(temp_dir.path().join("players.jsonl").exists());
    }

    #[test]
    fn test_store_save_overwrites_whole_record() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        store.save(&player(1, "Carlsen")).unwrap();
        store.save(&player(1, "Kasparov")).unwrap();

        let all: Vec<Player> = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].last_name, "Kasparov");
    }

    #[test]
    fn test_store_load_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let err = store
            .load::<Player>(EntityId::player(7).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::NotFound {
                kind: EntityKind::Player,
                ..
            }
        ));
    }

    #[test]
    fn test_store_next_id_is_max_plus_one() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        assert_eq!(store.next_id(EntityKind::Player).unwrap().to_string(), "p_1");

        store.save(&player(1, "A")).unwrap();
        store.save(&player(5, "B")).unwrap();
        assert_eq!(store.next_id(EntityKind::Player).unwrap().to_string(), "p_6");
        assert_eq!(store.next_id(EntityKind::Match).unwrap().to_string(), "m_1");
    }

    #[test]
    fn test_store_id_allocator() {
        use crate::models::IdAllocator;

        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);
        store.save(&player(3, "A")).unwrap();

        let mut ids = store.id_allocator().unwrap();
        assert_eq!(ids.allocate(EntityKind::Player).to_string(), "p_4");
        assert_eq!(ids.allocate(EntityKind::Round).to_string(), "r_1");
    }

    #[test]
    fn test_store_keeps_other_records_on_save() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        store
            .save_all(&[player(1, "A"), player(2, "B"), player(3, "C")])
            .unwrap();
        store.save(&player(2, "Z")).unwrap();

        let names: Vec<String> = store
            .load_all::<Player>()
            .unwrap()
            .into_iter()
            .map(|p| p.last_name)
            .collect();
        assert_eq!(names, vec!["A", "Z", "C"]);
    }
}
