//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Global hotkey that toggles the history window
pub const DEFAULT_GLOBAL_HOTKEY: &str = "<CTRL><ALT>H";

/// Lines of an entry shown in the list
pub const DEFAULT_LINES_TO_DISPLAY: usize = 4;

/// Send Ctrl+V after re-publishing an entry
pub const DEFAULT_SEND_PASTE: bool = true;

/// Retention limits (0 disables either policy)
pub const DEFAULT_MAX_ENTRIES: usize = 300;
pub const DEFAULT_EXPIRE_DAYS: u32 = 14;

/// Semicolon-separated list of excluded applications
pub const DEFAULT_EXCLUDE: &str = "";

pub const DEFAULT_PRIVATE_MODE: bool = false;

/// Default history window size
pub const DEFAULT_WINDOW_WIDTH: u32 = 275;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 230;

/// Settings file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "settings.json";
