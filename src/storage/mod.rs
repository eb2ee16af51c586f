//! Persisted entry store
//!
//! Entries live in a single pretty-printed JSON array. Loading is tolerant:
//! malformed records are dropped with a warning and an unreadable or
//! non-array file behaves like an empty store, so a damaged file never
//! blocks a crawl. Saving writes a temp file and renames it over the target.

pub mod dedup;

pub use dedup::{merge_entries, resolve_date_collisions, score_traditional};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::ResolvedEntry;
use crate::utils::error::StoreError;

/// JSON file holding every resolved entry seen so far
#[derive(Debug, Clone)]
pub struct EntryStore {
    path: PathBuf,
}

impl EntryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored entries, skipping anything that does not deserialize
    pub fn load(&self) -> Vec<ResolvedEntry> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No entry store yet");
            return Vec::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable entry store, starting empty");
                return Vec::new();
            }
        };

        let records: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Entry store is not a JSON array, starting empty");
                return Vec::new();
            }
        };

        let total = records.len();
        let entries: Vec<ResolvedEntry> = records
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| match serde_json::from_value(record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(index = i, error = %e, "Dropping malformed stored entry");
                    None
                }
            })
            .collect();

        debug!(path = %self.path.display(), loaded = entries.len(), total, "Entry store loaded");
        entries
    }

    /// Write `entries` atomically, creating parent directories as needed
    pub fn save(&self, entries: &[ResolvedEntry]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let temp_path = self.temp_path();
        let file = File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|e| StoreError::io(&temp_path, e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))?;

        debug!(path = %self.path.display(), count = entries.len(), "Entry store saved");
        Ok(())
    }

    /// Merge `incoming` into the stored set, save, and return the merged set
    pub fn merge_and_save(&self, incoming: Vec<ResolvedEntry>) -> Result<Vec<ResolvedEntry>, StoreError> {
        let merged = merge_entries(self.load(), incoming);
        self.save(&merged)?;
        Ok(merged)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "entries.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
