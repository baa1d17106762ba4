//! clipkeeper - clipboard history manager core
//!
//! Captures every clipboard change into a deduplicated SQLite history,
//! re-publishes stored entries on request, and binds a global hotkey that
//! toggles the history window.

pub mod checksum;
pub mod clipboard;
pub mod clipboard_history;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod hotkeys;
pub mod logging;
pub mod owner;
pub mod paste;
pub mod singleton;

/// Name used for the data directory, instance lock and mutex.
pub const APP_NAME: &str = "clipkeeper";
