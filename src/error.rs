use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, warn};

use crate::hotkeys::ChordParseError;

/// Error severity for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // informational
    Warning,  // recoverable
    Error,    // operation failed
    Critical, // feature unavailable
}

/// Domain-specific errors for clipkeeper
#[derive(Error, Debug)]
pub enum ClipkeeperError {
    #[error("storage error during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to prepare directory '{path}': {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid key chord: {0}")]
    Chord(#[from] ChordParseError),

    #[error("hotkey '{chord}' could not be registered: {reason}")]
    HotkeyRegistration { chord: String, reason: String },

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("another instance is already running (pid {pid:?})")]
    AlreadyRunning { pid: Option<u32> },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClipkeeperError {
    /// Wrap a SQLite error with the store operation that produced it.
    pub fn storage(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Storage { operation, source }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Storage { .. } => ErrorSeverity::Error,
            Self::DataDir { .. } => ErrorSeverity::Critical,
            Self::Chord(_) => ErrorSeverity::Warning,
            Self::HotkeyRegistration { .. } => ErrorSeverity::Warning,
            Self::Clipboard(_) => ErrorSeverity::Warning,
            Self::AlreadyRunning { .. } => ErrorSeverity::Info,
            Self::Config(_) => ErrorSeverity::Warning,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Storage { operation, .. } => {
                format!("Clipboard history could not complete '{}'", operation)
            }
            Self::DataDir { path, .. } => {
                format!("Could not create data directory {}", path.display())
            }
            Self::Chord(e) => format!("Invalid hotkey: {}", e),
            Self::HotkeyRegistration { chord, .. } => format!(
                "Hotkey '{}' is in use by another application. Choose a different shortcut.",
                chord
            ),
            Self::Clipboard(msg) => format!("Clipboard unavailable: {}", msg),
            Self::AlreadyRunning { .. } => "clipkeeper is already running".to_string(),
            Self::Config(msg) => format!("Configuration issue: {}", msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipkeeperError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use clipkeeper::error::ResultExt;
///
/// // Log and continue if a blob insert fails
/// store.insert_blob(id, "text/plain", b"hi").log_err();
///
/// // Log as warning for expected failures
/// let owner = resolve_owner().warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_carries_operation() {
        let err = ClipkeeperError::storage("insert_entry")(rusqlite::Error::InvalidQuery);
        assert!(err.to_string().contains("insert_entry"));
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_already_running_is_informational() {
        let err = ClipkeeperError::AlreadyRunning { pid: Some(42) };
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert_eq!(err.user_message(), "clipkeeper is already running");
    }

    #[test]
    fn test_log_err_returns_none_on_error() {
        let result: std::result::Result<u32, &str> = Err("boom");
        assert_eq!(result.log_err(), None);
        let ok: std::result::Result<u32, &str> = Ok(7);
        assert_eq!(ok.warn_on_err(), Some(7));
    }
}
