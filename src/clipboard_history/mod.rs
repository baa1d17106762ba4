//! Clipboard History Module
//!
//! SQLite-backed clipboard history: deduplicated entries, their stored
//! formats, and the controller that applies dedup, exclusion and retention.
//!
//! ## Features
//! - One entry per distinct checksum; re-copying refreshes its timestamp
//! - Every allow-listed format stored as its own blob
//! - Retention by entry count and by age; kept entries are exempt
//! - Entries re-published to the clipboard with an optional paste
//!
//! ## Module Structure
//! - `types`: Entry, Blob and id aliases
//! - `database`: SQLite operations (CRUD, migrations, search)
//! - `titles`: full and short title construction
//! - `controller`: snapshot ingest, apply, retention sweep

mod controller;
mod database;
mod titles;
mod types;

pub use controller::{
    now_ms, DropReason, HistoryController, HistorySettings, HistoryView, LogView,
    SnapshotOutcome, SweepReport, IGNORE_NEXT_TIMEOUT,
};
pub use database::{default_data_dir, get_db_path, HistoryStore, DB_FILE_NAME};
pub use titles::{clean_up_text, full_title, short_title, TRUNCATION_MARKER};
pub use types::{Blob, BlobId, Entry, EntryId};
