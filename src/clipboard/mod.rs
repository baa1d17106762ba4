//! Clipboard access
//!
//! Provides the snapshot model shared by the observer, the checksum engine and
//! the history controller, plus the OS backends that read and publish it.
//!
//! ## Module Structure
//! - `observer`: `ClipboardObserver`, the backend trait and the in-memory backend
//! - `system`: OS clipboard backend built on clipboard-rs
//! - `monitor`: watcher thread that posts change notifications to the core loop

mod monitor;
mod observer;
mod system;

pub use monitor::ClipboardMonitor;
pub use observer::{ClipboardBackend, ClipboardObserver, MemoryClipboard, ObserverEvent};
pub use system::SystemClipboard;

/// Clipboard formats the history persists and republishes.
pub mod formats {
    pub const TEXT_HTML: &str = "text/html";
    pub const TEXT_HTML_UTF8: &str = "text/html;charset=utf-8";
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";
    pub const TEXT_RICHTEXT: &str = "text/richtext";
    pub const QT_WINDOWS_RTF: &str = "application/x-qt-windows-mime;value=\"Rich Text Format\"";
    pub const URI_LIST: &str = "text/uri-list";
    pub const GNOME_COPIED_FILES: &str = "x-special/gnome-copied-files";

    /// Fixed allow-list of textual formats. Anything else (images, arbitrary
    /// binary targets) is never stored or republished.
    #[cfg(unix)]
    pub const ALLOWED: &[&str] = &[
        TEXT_HTML,
        TEXT_HTML_UTF8,
        TEXT_PLAIN,
        TEXT_PLAIN_UTF8,
        TEXT_RICHTEXT,
        QT_WINDOWS_RTF,
        URI_LIST,
        GNOME_COPIED_FILES,
    ];

    #[cfg(not(unix))]
    pub const ALLOWED: &[&str] = &[
        TEXT_HTML,
        TEXT_HTML_UTF8,
        TEXT_PLAIN,
        TEXT_PLAIN_UTF8,
        TEXT_RICHTEXT,
        QT_WINDOWS_RTF,
        URI_LIST,
    ];

    pub fn is_allowed(format: &str) -> bool {
        ALLOWED.contains(&format)
    }
}

/// The clipboard's contents at one point in time: ordered (format, bytes) pairs
/// with at most one payload per format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    items: Vec<(String, Vec<u8>)>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, F>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, Vec<u8>)>,
        F: Into<String>,
    {
        let mut snapshot = Self::new();
        for (format, payload) in pairs {
            snapshot.insert(format, payload);
        }
        snapshot
    }

    /// Set the payload for a format, replacing any previous payload.
    pub fn insert(&mut self, format: impl Into<String>, payload: Vec<u8>) {
        let format = format.into();
        match self.items.iter_mut().find(|(f, _)| *f == format) {
            Some(slot) => slot.1 = payload,
            None => self.items.push((format, payload)),
        }
    }

    pub fn get(&self, format: &str) -> Option<&[u8]> {
        self.items
            .iter()
            .find(|(f, _)| f == format)
            .map(|(_, payload)| payload.as_slice())
    }

    pub fn contains(&self, format: &str) -> bool {
        self.get(format).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.items
            .iter()
            .map(|(format, payload)| (format.as_str(), payload.as_slice()))
    }

    /// Copy of this snapshot restricted to the allow-listed formats.
    pub fn allowed(&self) -> Snapshot {
        Snapshot {
            items: self
                .items
                .iter()
                .filter(|(format, _)| formats::is_allowed(format))
                .cloned()
                .collect(),
        }
    }

    /// Plain text, preferring the explicit utf-8 target.
    pub fn text(&self) -> Option<String> {
        self.first_string(&[formats::TEXT_PLAIN_UTF8, formats::TEXT_PLAIN])
    }

    pub fn html(&self) -> Option<String> {
        self.first_string(&[formats::TEXT_HTML, formats::TEXT_HTML_UTF8])
    }

    /// URIs from `text/uri-list`, or from a GNOME file-copy payload when no uri
    /// list is present. Comment lines and blanks are skipped.
    pub fn urls(&self) -> Vec<String> {
        if let Some(list) = self.get(formats::URI_LIST) {
            return String::from_utf8_lossy(list)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect();
        }

        if let Some(copied) = self.get(formats::GNOME_COPIED_FILES) {
            // First line is the operation ("copy" or "cut")
            return String::from_utf8_lossy(copied)
                .lines()
                .skip(1)
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
        }

        Vec::new()
    }

    fn first_string(&self, candidates: &[&str]) -> Option<String> {
        candidates
            .iter()
            .find_map(|format| self.get(format))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_format() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(formats::TEXT_PLAIN, b"one".to_vec());
        snapshot.insert(formats::TEXT_PLAIN, b"two".to_vec());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(formats::TEXT_PLAIN), Some(&b"two"[..]));
    }

    #[test]
    fn test_allowed_drops_images() {
        let snapshot = Snapshot::from_pairs([
            ("image/png", vec![1, 2, 3]),
            (formats::TEXT_PLAIN, b"caption".to_vec()),
        ]);
        let allowed = snapshot.allowed();
        assert_eq!(allowed.len(), 1);
        assert!(allowed.contains(formats::TEXT_PLAIN));
    }

    #[test]
    fn test_urls_skip_comments() {
        let snapshot = Snapshot::from_pairs([(
            formats::URI_LIST,
            b"# comment\r\nfile:///home/a.txt\r\n\r\n".to_vec(),
        )]);
        assert_eq!(snapshot.urls(), vec!["file:///home/a.txt".to_string()]);
    }

    #[test]
    fn test_urls_from_gnome_copied_files() {
        let snapshot = Snapshot::from_pairs([(
            formats::GNOME_COPIED_FILES,
            b"copy\nfile:///home/a.txt\nfile:///home/b.txt".to_vec(),
        )]);
        assert_eq!(
            snapshot.urls(),
            vec![
                "file:///home/a.txt".to_string(),
                "file:///home/b.txt".to_string()
            ]
        );
    }

    #[test]
    fn test_text_prefers_utf8_target() {
        let snapshot = Snapshot::from_pairs([
            (formats::TEXT_PLAIN, b"latin".to_vec()),
            (formats::TEXT_PLAIN_UTF8, "ünïcode".as_bytes().to_vec()),
        ]);
        assert_eq!(snapshot.text().as_deref(), Some("ünïcode"));
    }

    #[test]
    fn test_empty_text_is_absent() {
        let snapshot = Snapshot::from_pairs([(formats::TEXT_PLAIN, Vec::new())]);
        assert_eq!(snapshot.text(), None);
    }
}
