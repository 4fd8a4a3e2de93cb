//! Persisted key/value settings
//!
//! Settings live in a single JSON object file. Keys missing from the file are
//! filled in by [`SettingsStore::defaults`]; writes go to a temp file that is
//! renamed over the original.

use crate::error::{Result, SimlinkError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON-file backed settings
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    /// Backing file, `None` for in-memory stores
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl SettingsStore {
    /// Store that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the settings file at `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(SimlinkError::Settings(format!(
                        "{} does not contain a JSON object",
                        path.display()
                    )));
                }
                Err(e) => {
                    return Err(SimlinkError::Settings(format!(
                        "Failed to parse {}: {}",
                        path.display(),
                        e
                    )));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings file at {}, starting empty", path.display());
                Map::new()
            }
            Err(e) => {
                return Err(SimlinkError::Settings(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        debug!("Loaded {} settings from {}", values.len(), path.display());
        Ok(Self {
            path: Some(path),
            values,
        })
    }

    /// Insert each pair whose key is not already present
    pub fn defaults<'a, I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        for (key, value) in pairs {
            self.values.entry(key.to_string()).or_insert(value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for `key`; non-string values are rendered as JSON
    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => default.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Unsigned value for `key`; accepts numbers and numeric strings
    pub fn get_u32(&self, key: &str, default: u32) -> u32 {
        match self.values.get(key) {
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn put(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the store back to its file. In-memory stores do nothing.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let text = serde_json::to_string_pretty(&self.values)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;

        debug!("Saved {} settings to {}", self.values.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        assert!(store.get("bans").is_none());
    }

    #[test]
    fn test_defaults_do_not_overwrite() {
        let mut store = SettingsStore::in_memory();
        store.put("shufflemode", "all");
        store.defaults([("shufflemode", json!("custom")), ("bans", json!(""))]);

        assert_eq!(store.get_string("shufflemode", "none"), "all");
        assert_eq!(store.get_string("bans", "x"), "");
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = SettingsStore::open(&path).unwrap();
        store.put("lastServerMode", "pvp");
        store.put("roundExtraTime", 20);
        store.save().unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get_string("lastServerMode", "survival"), "pvp");
        assert_eq!(reopened.get_u32("roundExtraTime", 12), 20);
    }

    #[test]
    fn test_get_u32_fallbacks() {
        let mut store = SettingsStore::in_memory();
        store.put("a", "15");
        store.put("b", "soon");
        store.put("c", -3);
        assert_eq!(store.get_u32("a", 1), 15);
        assert_eq!(store.get_u32("b", 1), 1);
        assert_eq!(store.get_u32("c", 1), 1);
        assert_eq!(store.get_u32("missing", 7), 7);
    }

    #[test]
    fn test_rejects_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            SettingsStore::open(&path),
            Err(SimlinkError::Settings(_))
        ));
    }
}
