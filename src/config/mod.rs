//! Configuration module - Application settings and user preferences
//!
//! This module provides functionality for:
//! - Loading and saving settings.json in the per-user config directory
//! - Default values for all settings
//! - Type definitions for config structures
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - Configuration struct definitions (Config, OpenWindowAt, etc.)
//! - `loader` - File system loading and saving

mod defaults;
mod loader;
mod types;

pub use defaults::{
    CONFIG_FILE_NAME, DEFAULT_EXPIRE_DAYS, DEFAULT_GLOBAL_HOTKEY, DEFAULT_LINES_TO_DISPLAY,
    DEFAULT_MAX_ENTRIES,
};

pub use types::{Config, OpenWindowAt, WindowPosition, WindowSize};

pub use loader::{default_config_path, load_config, save_config};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
