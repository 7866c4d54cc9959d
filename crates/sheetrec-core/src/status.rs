//! Counters returned by mutating operations

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Outcome of an update
///
/// Scan-based and single-row updates fill `records_updated` and `errors`;
/// bulk reconciliation fills the first three and leaves `errors` at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub records_updated: usize,
    pub records_inserted: usize,
    pub records_archived: usize,
    pub errors: usize,
}

impl UpdateStatus {
    /// Create a zeroed status
    pub fn new() -> Self {
        Self::default()
    }
}

impl AddAssign for UpdateStatus {
    fn add_assign(&mut self, other: Self) {
        self.records_updated += other.records_updated;
        self.records_inserted += other.records_inserted;
        self.records_archived += other.records_archived;
        self.errors += other.errors;
    }
}
