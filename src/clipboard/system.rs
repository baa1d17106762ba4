//! OS clipboard backend built on clipboard-rs.

use clipboard_rs::{Clipboard, ClipboardContent, ClipboardContext, ContentFormat};
use tracing::debug;

use super::observer::ClipboardBackend;
use super::{formats, Snapshot};
use crate::error::{ClipkeeperError, Result};

fn map_clipboard_err<T>(
    result: std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>,
) -> Result<T> {
    result.map_err(|e| ClipkeeperError::Clipboard(e.to_string()))
}

pub struct SystemClipboard {
    ctx: ClipboardContext,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let ctx = map_clipboard_err(ClipboardContext::new())?;
        Ok(Self { ctx })
    }
}

/// Turn a bare path into a `file://` URI; URIs pass through unchanged.
fn to_uri(file: &str) -> String {
    if file.contains("://") {
        file.to_string()
    } else {
        format!("file:///{}", file.trim_start_matches('/').replace('\\', "/"))
    }
}

/// Map a snapshot onto clipboard-rs contents. Returns the formats that have no
/// native mapping on this platform alongside.
fn to_contents(snapshot: &Snapshot) -> (Vec<ClipboardContent>, Vec<String>) {
    let mut contents = Vec::with_capacity(snapshot.len());
    #[cfg_attr(not(windows), allow(unused_mut))]
    let mut skipped = Vec::new();
    let mut wrote_text = false;
    let mut wrote_html = false;

    for (format, payload) in snapshot.iter() {
        match format {
            formats::TEXT_PLAIN | formats::TEXT_PLAIN_UTF8 if !wrote_text => {
                contents.push(ClipboardContent::Text(
                    String::from_utf8_lossy(payload).into_owned(),
                ));
                wrote_text = true;
            }
            formats::TEXT_HTML | formats::TEXT_HTML_UTF8 if !wrote_html => {
                contents.push(ClipboardContent::Html(
                    String::from_utf8_lossy(payload).into_owned(),
                ));
                wrote_html = true;
            }
            formats::TEXT_RICHTEXT => {
                contents.push(ClipboardContent::Rtf(
                    String::from_utf8_lossy(payload).into_owned(),
                ));
            }
            #[cfg(windows)]
            formats::URI_LIST => {
                let files = String::from_utf8_lossy(payload)
                    .lines()
                    .map(|uri| uri.trim().trim_start_matches("file:///").replace('/', "\\"))
                    .filter(|path| !path.is_empty())
                    .collect();
                contents.push(ClipboardContent::Files(files));
            }
            #[cfg(windows)]
            _ => skipped.push(format.to_string()),
            #[cfg(not(windows))]
            _ => contents.push(ClipboardContent::Other(format.to_string(), payload.to_vec())),
        }
    }

    (contents, skipped)
}

impl ClipboardBackend for SystemClipboard {
    fn read(&mut self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();

        if self.ctx.has(ContentFormat::Text) {
            if let Ok(text) = self.ctx.get_text() {
                snapshot.insert(formats::TEXT_PLAIN, text.into_bytes());
            }
        }
        if self.ctx.has(ContentFormat::Html) {
            if let Ok(html) = self.ctx.get_html() {
                snapshot.insert(formats::TEXT_HTML, html.into_bytes());
            }
        }
        if self.ctx.has(ContentFormat::Rtf) {
            if let Ok(rtf) = self.ctx.get_rich_text() {
                snapshot.insert(formats::TEXT_RICHTEXT, rtf.into_bytes());
            }
        }
        if self.ctx.has(ContentFormat::Files) {
            if let Ok(files) = self.ctx.get_files() {
                let list: Vec<String> = files.iter().map(|f| to_uri(f)).collect();
                if !list.is_empty() {
                    snapshot.insert(formats::URI_LIST, list.join("\r\n").into_bytes());
                }
            }
        }

        // Raw pass for allow-listed targets the typed getters don't cover
        let available = map_clipboard_err(self.ctx.available_formats())?;
        for format in available {
            if !formats::is_allowed(&format) || snapshot.contains(&format) {
                continue;
            }
            if let Ok(buf) = self.ctx.get_buffer(&format) {
                snapshot.insert(format, buf);
            }
        }

        debug!(formats = snapshot.len(), "Read clipboard snapshot");
        Ok(snapshot)
    }

    fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        let (contents, skipped) = to_contents(snapshot);
        for format in &skipped {
            debug!(format = %format, "No native mapping for clipboard format, not published");
        }

        debug!(formats = contents.len(), skipped = skipped.len(), "Publishing clipboard snapshot");
        map_clipboard_err(self.ctx.set(contents))
    }

    fn clear(&mut self) -> Result<()> {
        map_clipboard_err(self.ctx.clear())
    }

    fn tracks_ownership(&self) -> bool {
        cfg!(all(unix, not(target_os = "macos")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_uri_keeps_existing_uri() {
        assert_eq!(to_uri("file:///tmp/a.txt"), "file:///tmp/a.txt");
    }

    #[test]
    fn test_to_uri_from_posix_path() {
        assert_eq!(to_uri("/tmp/a.txt"), "file:///tmp/a.txt");
    }

    #[test]
    fn test_to_uri_from_windows_path() {
        assert_eq!(to_uri("C:\\Users\\me\\a.txt"), "file:///C:/Users/me/a.txt");
    }

    fn utf8_variants() -> Snapshot {
        Snapshot::from_pairs([
            (formats::TEXT_PLAIN, b"hi".to_vec()),
            (formats::TEXT_PLAIN_UTF8, b"hi".to_vec()),
            (formats::TEXT_HTML, b"<b>hi</b>".to_vec()),
        ])
    }

    #[cfg(windows)]
    #[test]
    fn test_unmapped_formats_are_reported() {
        let (contents, skipped) = to_contents(&utf8_variants());
        assert_eq!(contents.len(), 2);
        assert_eq!(skipped, vec![formats::TEXT_PLAIN_UTF8.to_string()]);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_extra_variants_published_raw() {
        let (contents, skipped) = to_contents(&utf8_variants());
        assert_eq!(contents.len(), 3);
        assert!(skipped.is_empty());
        assert!(matches!(
            &contents[1],
            ClipboardContent::Other(format, _) if format == formats::TEXT_PLAIN_UTF8
        ));
    }

    #[cfg(feature = "system-tests")]
    #[test]
    fn test_system_clipboard_text_round_trip() {
        let mut clipboard = SystemClipboard::new().expect("clipboard available");
        let snapshot = Snapshot::from_pairs([(formats::TEXT_PLAIN, b"clipkeeper".to_vec())]);
        clipboard.write(&snapshot).expect("write clipboard");
        let read = clipboard.read().expect("read clipboard");
        assert_eq!(read.text().as_deref(), Some("clipkeeper"));
    }
}
