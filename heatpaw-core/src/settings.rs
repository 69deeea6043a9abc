//! Key-value settings storage used for persistence.
//!
//! The on-disk form is a single JSON object of string values. Writes go to a
//! sibling temp file first and are renamed into place.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::error::StorageError;

/// A store of named string values.
pub trait SettingsStore: Send {
    fn get_string(&self, key: &str) -> Option<String>;

    fn set_string(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile settings, for tests and one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Settings persisted to a JSON file.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSettings {
    /// Open the settings file, starting empty if it does not exist yet or
    /// cannot be parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "settings file is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(io_error(&path, source)),
        };

        Ok(Self { path, values })
    }

    /// Write `values` to disk. The in-memory map is only replaced by callers
    /// after this succeeds, so a failed write leaves both sides unchanged.
    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let json = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;

        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let mut next = self.values.clone();
        next.insert(key.to_string(), value);
        self.flush(&next)?;
        self.values = next;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.values.contains_key(key) {
            return Ok(());
        }

        let mut next = self.values.clone();
        next.remove(key);
        self.flush(&next)?;
        self.values = next;
        Ok(())
    }
}

fn io_error(path: &Path, source: io::Error) -> StorageError {
    StorageError::Io { path: path.display().to_string(), source }
}
