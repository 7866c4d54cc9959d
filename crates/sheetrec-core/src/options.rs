//! Configuration shared by every read, write and reconcile operation

use crate::error::{Error, Result};
use crate::grid::Region;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Optional settings recognized by the public operations
///
/// Every field defaults to "off" or "derive it from the sheet". Each
/// operation reads only the fields that apply to it. In JSON the keys are
/// camelCase, e.g. `{"matchHeaders": ["Student ID"], "upsertNewRecords": true}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Headers the sheet should contain (header upsert)
    pub expected_headers: Option<Vec<String>>,
    /// Row holding the column headers; 1 when unset
    pub column_headers_row_index: Option<u32>,
    /// Freeze the header row(s) after an upsert
    pub freeze_headers: bool,
    /// Exact data block to read, instead of everything below the header row
    pub data_range: Option<Region>,
    /// Exact header block; its row also sets the header row
    pub headers_range: Option<Region>,
    /// First row written by `write_rows`; the row below the headers when unset
    pub first_data_row_index: Option<u32>,
    /// Single-row update: check the row's match fields before overwriting
    pub require_match: bool,
    /// Single-row update: headers compared when `require_match` is set
    pub match_headers: Option<Vec<String>>,
    /// Scan update: fail if the scan finds matching records
    pub require_unique: bool,
    /// Bulk update: insert source records that have no destination match
    pub upsert_new_records: bool,
    /// Bulk update: move unmatched destination records to `<sheet>_archive`
    pub remove_and_archive_non_matching_records: bool,
}

impl Options {
    /// Create options with every default
    pub fn new() -> Self {
        Self::default()
    }

    /// The header row, from `headers_range`, then `column_headers_row_index`, then 1
    pub fn header_row(&self) -> u32 {
        self.headers_range
            .map(|r| r.row)
            .or(self.column_headers_row_index)
            .filter(|&row| row > 0)
            .unwrap_or(1)
    }

    /// Load options from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the options to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
