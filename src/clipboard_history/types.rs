//! Clipboard history types

use serde::Serialize;

use crate::checksum::Fingerprint;

pub type EntryId = i64;
pub type BlobId = i64;

/// One deduplicated clipboard capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    /// Complete textual representation, used for search
    pub full_title: String,
    /// Display representation (first N lines)
    pub short_title: String,
    pub checksum: Fingerprint,
    /// Milliseconds since epoch; doubles as "last used"
    pub created_at: i64,
    /// Never evicted by retention
    pub keep: bool,
}

/// One stored (format, payload) pair of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub format: String,
    pub payload: Vec<u8>,
}
