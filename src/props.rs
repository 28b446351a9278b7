//! Flat key-value property store.
//!
//! Holds the run configuration and the persisted backfill cursor in a single
//! JSON file of string properties, read at the start of every run. The
//! cursor (`BACKFILL_START`) is the only property the pipeline writes back.

use crate::error::{Result, WatchError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Property key for the persisted backfill cursor
pub const BACKFILL_START_KEY: &str = "BACKFILL_START";

/// Default property file path: `<config dir>/ciniiwatch/properties.json`
fn default_props_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("ciniiwatch").join("properties.json"))
        .ok_or_else(|| WatchError::Config("Cannot determine config directory".to_string()))
}

/// File-backed flat property set.
pub struct PropertyStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PropertyStore {
    /// Open the store at the default path, loading existing properties.
    pub fn open_default() -> Result<Self> {
        Self::open(default_props_path()?)
    }

    /// Open the store at a custom path, loading existing properties.
    ///
    /// A missing or unreadable file yields an empty property set; required
    /// keys are enforced later by config validation.
    pub fn open(path: PathBuf) -> Result<Self> {
        let values = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                    Ok(values) => {
                        debug!("Loaded {} properties from {:?}", values.len(), path);
                        values
                    }
                    Err(e) => {
                        warn!("Failed to parse property file: {}", e);
                        BTreeMap::new()
                    }
                },
                Err(e) => {
                    warn!("Failed to read property file: {}", e);
                    BTreeMap::new()
                }
            }
        } else {
            debug!("Property file not found: {:?}", path);
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    /// Get the property file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    /// Set a property value and persist the whole set.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    /// Iterate over all properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)?;
        info!("Saved {} properties to {:?}", self.values.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_is_empty() -> Result<()> {
        let store = PropertyStore::open(PathBuf::from("/nonexistent/props.json"))?;
        assert!(store.get("ANY").is_none());
        Ok(())
    }

    #[test]
    fn test_set_and_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("properties.json");

        let mut store = PropertyStore::open(path.clone())?;
        store.set(BACKFILL_START_KEY, "30")?;
        store.set("NOTIFY_EMAIL", "a@example.com")?;

        let reloaded = PropertyStore::open(path)?;
        assert_eq!(reloaded.get(BACKFILL_START_KEY), Some("30"));
        assert_eq!(reloaded.get("NOTIFY_EMAIL"), Some("a@example.com"));
        Ok(())
    }
}
