//! Tabular store adapter.
//!
//! The pipeline only needs two operations from its durable store: read the
//! identity-key column of every existing row, and append a batch of new rows.
//! [`CsvStore`] satisfies that with a single CSV file whose header is
//! `timestamp,source,title,link,abstract,published,id_key`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// One durable row, as appended by the persistence gate.
///
/// `abstract_text` is already cleaned and truncated; `timestamp` is shared
/// by every row of the same run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRow {
    pub timestamp: String,
    pub source: String,
    pub title: String,
    pub link: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub published: String,
    pub id_key: String,
}

/// Durable tabular store capability.
///
/// Any backend that can read back its identity keys and bulk-append rows
/// satisfies the pipeline; the CSV file is just the default adapter.
pub trait Store {
    /// All identity keys already recorded, excluding the header.
    fn read_identity_keys(&self) -> Result<HashSet<String>>;

    /// Append all rows in one write.
    fn append_rows(&self, rows: &[StoreRow]) -> Result<()>;
}

/// CSV-file-backed store.
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Whether the file is absent or empty (header not yet written).
    fn needs_header(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        }
    }
}

impl Store for CsvStore {
    fn read_identity_keys(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            debug!("Store file not found: {:?}", self.path);
            return Ok(HashSet::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut keys = HashSet::new();
        for record in reader.deserialize::<StoreRow>() {
            let row = record?;
            if !row.id_key.is_empty() {
                keys.insert(row.id_key);
            }
        }
        info!("Loaded {} existing keys from {:?}", keys.len(), self.path);
        Ok(keys)
    }

    fn append_rows(&self, rows: &[StoreRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let write_header = self.needs_header();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);

        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!("Appended {} rows to {:?}", rows.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str) -> StoreRow {
        StoreRow {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            source: "CiNii".to_string(),
            title: format!("title {}", key),
            link: format!("https://x/{}", key),
            abstract_text: "abs".to_string(),
            published: String::new(),
            id_key: key.to_string(),
        }
    }

    #[test]
    fn test_missing_file_has_no_keys() -> Result<()> {
        let store = CsvStore::new(PathBuf::from("/nonexistent/papers.csv"));
        assert!(store.read_identity_keys()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_append_then_read_keys() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("papers.csv");
        let store = CsvStore::new(path.clone());

        store.append_rows(&[row("k1"), row("k2")])?;
        store.append_rows(&[row("k3")])?;

        let keys = store.read_identity_keys()?;
        assert_eq!(keys.len(), 3);
        assert!(keys.contains("k1") && keys.contains("k3"));

        // Header written exactly once
        let content = std::fs::read_to_string(path)?;
        assert_eq!(content.matches("timestamp").count(), 1);
        assert!(content.starts_with("timestamp,source,title,link,abstract,published,id_key"));
        Ok(())
    }

    #[test]
    fn test_empty_append_writes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("papers.csv");
        let store = CsvStore::new(path.clone());
        store.append_rows(&[])?;
        assert!(!path.exists());
        Ok(())
    }
}
