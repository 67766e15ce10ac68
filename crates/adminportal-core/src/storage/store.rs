use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage file name in the storage directory
const STORAGE_FILE: &str = "storage.json";
const STORAGE_TMP_FILE: &str = "storage.json.tmp";

/// String key/value store backing one storage scope.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Write several keys as one update.
    fn set_all(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove several keys as one update.
    fn remove_all(&mut self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Process-lifetime store. Contents vanish when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    stored_at: DateTime<Utc>,
}

/// JSON-file store that survives restarts.
///
/// Every update is written to a temporary file and renamed over the old one,
/// so the file on disk always holds either the previous or the new contents.
pub struct FileStore {
    path: PathBuf,
    tmp_path: PathBuf,
    entries: HashMap<String, StoredEntry>,
}

impl FileStore {
    /// Open the store in `dir`, loading any existing file.
    ///
    /// An unreadable or corrupt file is logged and treated as empty.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        let path = dir.join(STORAGE_FILE);
        let tmp_path = dir.join(STORAGE_TMP_FILE);

        let entries = if path.exists() {
            match Self::read_entries(&path) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Discarding unreadable storage file");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "Durable storage opened");

        Ok(Self {
            path,
            tmp_path,
            entries,
        })
    }

    fn read_entries(path: &Path) -> Result<HashMap<String, StoredEntry>> {
        let contents = std::fs::read_to_string(path).context("Failed to read storage file")?;
        serde_json::from_str(&contents).context("Failed to parse storage file")
    }

    fn write_entries(&self, entries: &HashMap<String, StoredEntry>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove storage file")?;
            }
            return Ok(());
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.tmp_path, contents).context("Failed to write storage file")?;
        std::fs::rename(&self.tmp_path, &self.path).context("Failed to replace storage file")?;
        Ok(())
    }

    /// Apply `edit` to a copy of the entries and persist it. The in-memory
    /// entries only change once the file has been replaced.
    fn update(
        &mut self,
        edit: impl FnOnce(&mut HashMap<String, StoredEntry>) -> bool,
    ) -> Result<()> {
        let mut next = self.entries.clone();
        if !edit(&mut next) {
            return Ok(());
        }
        self.write_entries(&next)?;
        self.entries = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|e| e.value.clone())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_all(&[(key, value)])
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.remove_all(&[key])
    }

    fn set_all(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        let stored_at = Utc::now();
        self.update(|map| {
            for (key, value) in entries {
                map.insert(
                    key.to_string(),
                    StoredEntry {
                        value: value.to_string(),
                        stored_at,
                    },
                );
            }
            !entries.is_empty()
        })
    }

    fn remove_all(&mut self, keys: &[&str]) -> Result<()> {
        self.update(|map| {
            let mut changed = false;
            for key in keys {
                changed |= map.remove(*key).is_some();
            }
            changed
        })
    }
}
