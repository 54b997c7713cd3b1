//! File-backed key-value store
//!
//! Keeps pending edits and cash counts in a single JSON object on disk so
//! they survive a restart. Write failures are logged and the in-memory copy
//! stays authoritative for the rest of the process.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use shared::KeyValueStore;
use tracing::warn;

use crate::error::{ClientError, ClientResult};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, creating it lazily on first write
    pub fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ClientError::Storage(format!("{} is not a valid store: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "Cannot read {}: {e}",
                    path.display()
                )))
            }
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) {
        if let Err(err) = self.try_write() {
            warn!(path = %self.path.display(), error = %err, "Failed to persist local store");
        }
    }

    fn try_write(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.write();
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.write();
        }
    }
}
