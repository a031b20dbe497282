use std::fs;
use std::path::Path;

use cm_core::parse_records;

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Import a JSON array of records from a file. Returns the number stored.
    pub fn import_json_file(&self, path: &Path) -> Result<usize> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        let records = parse_records(&json).map_err(|e| {
            StoreError::InvalidData(format!("invalid JSON in {}: {e}", path.display()))
        })?;
        self.upsert_records(&records, &path.display().to_string())
    }

    pub fn import_json_str(&self, json: &str) -> Result<usize> {
        let records =
            parse_records(json).map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;
        self.upsert_records(&records, "inline")
    }

    /// Write every stored record as a JSON array in the upstream field layout.
    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn export_json_string(&self) -> Result<String> {
        let records = self.load_records()?;
        serde_json::to_string_pretty(&records)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}
