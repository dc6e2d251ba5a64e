//! Persistence of the activity log behind a swappable interface.
//!
//! Business logic only ever sees [`LogState`]; where it lives (SQLite, a JSON
//! document, memory) is decided by [`open_store`] from the configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::config::{Config, StorageBackend};
use crate::database::{Database, DatabaseError};
use crate::ledger::LogState;

/// Version written into JSON documents
pub const JSON_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported document version {0}")]
    UnsupportedVersion(u32),
}

pub trait Store {
    fn load(&self) -> Result<LogState, StoreError>;
    fn save(&mut self, state: &LogState) -> Result<(), StoreError>;
}

impl Store for Database {
    fn load(&self) -> Result<LogState, StoreError> {
        Ok(LogState {
            activities: self.get_all_activities()?,
            submissions: self.get_all_submissions()?,
        })
    }

    fn save(&mut self, state: &LogState) -> Result<(), StoreError> {
        self.replace_state(state)?;
        debug!(
            activities = state.activities.len(),
            submissions = state.submissions.len(),
            "state saved to sqlite"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    version: u32,
    #[serde(flatten)]
    state: LogState,
}

/// Whole state as a single JSON document on disk
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<LogState, StoreError> {
        if !self.path.exists() {
            return Ok(LogState::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if contents.trim().is_empty() {
            return Ok(LogState::default());
        }
        let document: JsonDocument = serde_json::from_str(&contents)?;
        if document.version > JSON_DOCUMENT_VERSION {
            return Err(StoreError::UnsupportedVersion(document.version));
        }
        Ok(document.state)
    }

    fn save(&mut self, state: &LogState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let document = JsonDocument {
            version: JSON_DOCUMENT_VERSION,
            state: state.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "state saved to json");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: LogState,
}

impl MemoryStore {
    pub fn new(state: LogState) -> Self {
        Self { state }
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<LogState, StoreError> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &LogState) -> Result<(), StoreError> {
        self.state = state.clone();
        Ok(())
    }
}

/// Open the store selected by `storage.backend`
pub fn open_store(config: &Config) -> Result<Box<dyn Store>, StoreError> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = config.get_database_path();
            debug!(path = %path.display(), "opening sqlite store");
            Ok(Box::new(Database::new(&path)?))
        }
        StorageBackend::Json => {
            let path = config.get_json_store_path();
            debug!(path = %path.display(), "opening json store");
            Ok(Box::new(JsonFileStore::new(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewActivity;
    use chrono::NaiveDate;

    fn sample_state() -> LogState {
        let mut state = LogState::default();
        let date = NaiveDate::from_ymd_opt(2024, 9, 16).unwrap();
        state.add_activity(NewActivity::new("Ignition repair", date, 2.0)).unwrap();
        state
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("none.json"));
        assert_eq!(store.load().unwrap(), LogState::default());
    }

    #[test]
    fn json_store_round_trips_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("wk.json");
        let mut store = JsonFileStore::new(&path);
        let state = sample_state();
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), state);
        assert!(!path.with_extension("json.tmp").exists());

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert!(raw["activities"].is_array());
        assert!(raw["submissions"].is_array());
    }

    #[test]
    fn json_store_rejects_newer_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wk.json");
        fs::write(&path, r#"{"version": 99, "activities": [], "submissions": []}"#).unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(StoreError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn memory_store_holds_last_save() {
        let mut store = MemoryStore::default();
        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn sqlite_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::new(&dir.path().join("wk.db")).unwrap();
        let state = sample_state();
        db.save(&state).unwrap();
        assert_eq!(db.load().unwrap(), state);
    }

    #[test]
    fn sqlite_and_json_stores_agree_on_submissions() {
        use crate::backend::MockBackend;
        use crate::period::PayrollPeriod;

        let dir = tempfile::tempdir().unwrap();
        let mut state = sample_state();
        let period = PayrollPeriod::containing(NaiveDate::from_ymd_opt(2024, 9, 16).unwrap());
        let now = chrono::Local::now().naive_local();
        state.submit_period(&period, &MockBackend::instant(), now).unwrap();

        let mut db = Database::new(&dir.path().join("wk.db")).unwrap();
        let mut json = JsonFileStore::new(dir.path().join("wk.json"));
        db.save(&state).unwrap();
        json.save(&state).unwrap();

        assert_eq!(db.load().unwrap(), state);
        assert_eq!(json.load().unwrap(), db.load().unwrap());
    }

    #[test]
    fn open_store_follows_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database_path = dir.path().join("wk.db").to_string_lossy().to_string();
        config.storage.backend = StorageBackend::Json;

        let mut store = open_store(&config).unwrap();
        store.save(&sample_state()).unwrap();
        assert!(dir.path().join("wk.json").exists());
        assert!(!dir.path().join("wk.db").exists());
    }
}
