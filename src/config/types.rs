//! Configuration type definitions
//!
//! This module contains all the struct and enum definitions for configuration.

use serde::{Deserialize, Serialize};

use super::defaults::*;

// ============================================
// WINDOW
// ============================================

/// Where the history window appears when toggled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenWindowAt {
    /// Under the mouse cursor
    #[default]
    Cursor,
    /// Where the user last left it
    LastPosition,
    /// Next to the system tray
    SystemTray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

// ============================================
// MAIN CONFIG
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Chord that toggles the history window (default: <CTRL><ALT>H)
    #[serde(default = "default_global_hotkey")]
    pub global_hotkey: String,
    /// Lines of each entry shown in the list (default: 4)
    #[serde(default = "default_lines_to_display")]
    pub lines_to_display: usize,
    #[serde(default)]
    pub open_window_at: OpenWindowAt,
    /// Send Ctrl+V after selecting an entry (default: true)
    #[serde(default = "default_send_paste")]
    pub send_paste: bool,
    /// Maximum stored entries, 0 = unlimited (default: 300)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Days before an entry expires, 0 = never (default: 14)
    #[serde(default = "default_expire_days")]
    pub expire_days: u32,
    /// Semicolon-separated application names, e.g. "KeePass.exe;chromium;"
    #[serde(default = "default_exclude")]
    pub exclude: String,
    /// Stop recording and publishing clipboard contents
    #[serde(default = "default_private_mode")]
    pub private_mode: bool,
    #[serde(default)]
    pub window_size: WindowSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_position: Option<WindowPosition>,
}

fn default_global_hotkey() -> String {
    DEFAULT_GLOBAL_HOTKEY.to_string()
}
fn default_lines_to_display() -> usize {
    DEFAULT_LINES_TO_DISPLAY
}
fn default_send_paste() -> bool {
    DEFAULT_SEND_PASTE
}
fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}
fn default_expire_days() -> u32 {
    DEFAULT_EXPIRE_DAYS
}
fn default_exclude() -> String {
    DEFAULT_EXCLUDE.to_string()
}
fn default_private_mode() -> bool {
    DEFAULT_PRIVATE_MODE
}

impl Default for Config {
    fn default() -> Self {
        Config {
            global_hotkey: default_global_hotkey(),
            lines_to_display: DEFAULT_LINES_TO_DISPLAY,
            open_window_at: OpenWindowAt::default(),
            send_paste: DEFAULT_SEND_PASTE,
            max_entries: DEFAULT_MAX_ENTRIES,
            expire_days: DEFAULT_EXPIRE_DAYS,
            exclude: default_exclude(),
            private_mode: DEFAULT_PRIVATE_MODE,
            window_size: WindowSize::default(),
            window_position: None,
        }
    }
}

impl Config {
    /// Store a user-typed exclusion list.
    ///
    /// Spaces around separators are dropped, commas become semicolons, and a
    /// trailing semicolon is appended.
    pub fn set_exclude(&mut self, raw: &str) {
        if raw.is_empty() {
            self.exclude.clear();
            return;
        }
        let mut data = raw.replace("; ", ";").replace(" ;", ";").replace(',', ";");
        if !data.ends_with(';') {
            data.push(';');
        }
        self.exclude = data;
    }

    /// Excluded application names, lowercased, blanks removed.
    pub fn excluded_apps(&self) -> Vec<String> {
        self.exclude
            .split(';')
            .map(|app| app.trim().to_lowercase())
            .filter(|app| !app.is_empty())
            .collect()
    }

    pub fn set_private_mode(&mut self, enabled: bool) {
        self.private_mode = enabled;
    }

    /// Remember the window geometry chosen by the user.
    pub fn set_window_geometry(&mut self, size: WindowSize, position: Option<WindowPosition>) {
        self.window_size = size;
        self.window_position = position;
    }
}
