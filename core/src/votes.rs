//! Persisted set of feedback ids this device has already upvoted.
//!
//! # Design
//! The set lives in the host's key-value storage under one fixed key as a
//! string array. It is read once when a list model is created and rewritten
//! after every successful upvote. Two models writing concurrently is last
//! writer wins.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{FeedbackError, Result};

/// Storage key of the voted-id array.
pub const VOTED_IDS_KEY: &str = "feedbackkit.voted_ids";

/// Minimal string-array key-value storage (UserDefaults, SharedPreferences).
pub trait KeyValueStore: Send + Sync {
    fn load_strings(&self, key: &str) -> Result<Option<Vec<String>>>;
    fn store_strings(&self, key: &str, values: &[String]) -> Result<()>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load_strings(&self, key: &str) -> Result<Option<Vec<String>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn store_strings(&self, key: &str, values: &[String]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), values.to_vec());
        Ok(())
    }
}

/// Stores every key in a single JSON object file. A missing file is empty.
///
/// Writes go to a temporary file beside the target which is then renamed over
/// it, so readers see either the old or the new contents.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, Vec<String>>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| FeedbackError::Storage(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(FeedbackError::Storage(e.to_string())),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn load_strings(&self, key: &str) -> Result<Option<Vec<String>>> {
        Ok(self.read_all()?.remove(key))
    }

    fn store_strings(&self, key: &str, values: &[String]) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), values.to_vec());
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(storage_error)?;
        let raw = serde_json::to_string_pretty(&all).map_err(|e| FeedbackError::Storage(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(storage_error)?;
        tmp.write_all(raw.as_bytes()).map_err(storage_error)?;
        tmp.as_file().sync_all().map_err(storage_error)?;
        tmp.persist(&self.path).map_err(|e| storage_error(e.error))?;
        Ok(())
    }
}

fn storage_error(e: std::io::Error) -> FeedbackError {
    FeedbackError::Storage(e.to_string())
}

/// The voted-id set, loaded once from a store.
pub struct VotedIds {
    ids: BTreeSet<String>,
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for VotedIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VotedIds").field("ids", &self.ids).finish_non_exhaustive()
    }
}

impl VotedIds {
    /// Load the set. An unreadable store starts empty.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let ids = match store.load_strings(VOTED_IDS_KEY) {
            Ok(Some(ids)) => ids.into_iter().collect(),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!(error = %e, "could not read voted ids; starting empty");
                BTreeSet::new()
            }
        };
        Self { ids, store }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add `id` and persist the whole set. The in-memory set keeps the id
    /// even if persisting fails.
    pub fn record(&mut self, id: &str) -> Result<()> {
        self.ids.insert(id.to_string());
        let values: Vec<String> = self.ids.iter().cloned().collect();
        self.store.store_strings(VOTED_IDS_KEY, &values)
    }
}
