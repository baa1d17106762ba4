//! Content fingerprint used for clipboard dedup.
//!
//! The fingerprint is a CRC32 of the UTF-8 bytes of the best available textual
//! representation of a snapshot (uri list, then html, then plain text). It is a
//! dedup hint, not an integrity check: two payloads with the same CRC32 are
//! treated as the same content.

use crate::clipboard::Snapshot;

/// CRC32 fingerprint of a snapshot's identifying text.
pub type Fingerprint = u32;

/// Compute the fingerprint for a snapshot.
///
/// Returns `None` when the snapshot has no uri list, html, or plain text
/// (for example an image-only clipboard).
pub fn fingerprint(snapshot: &Snapshot) -> Option<Fingerprint> {
    let source = fingerprint_source(snapshot)?;
    Some(crc32fast::hash(source.as_bytes()))
}

/// The string the fingerprint is computed over.
pub fn fingerprint_source(snapshot: &Snapshot) -> Option<String> {
    let urls = snapshot.urls();
    if !urls.is_empty() {
        return Some(urls.join("\n"));
    }
    if let Some(html) = snapshot.html() {
        return Some(html);
    }
    snapshot.text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::formats;

    fn text(s: &str) -> Snapshot {
        Snapshot::from_pairs([(formats::TEXT_PLAIN, s.as_bytes().to_vec())])
    }

    #[test]
    fn test_fingerprint_is_crc32_of_utf8() {
        assert_eq!(fingerprint(&text("hello")), Some(0x3610_a686));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = text("grüße, 世界");
        let b = text("grüße, 世界");
        assert_eq!(fingerprint(&a), fingerprint(&a));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_different_content() {
        assert_ne!(fingerprint(&text("hello")), fingerprint(&text("hello!")));
    }

    #[test]
    fn test_html_takes_precedence_over_text() {
        let snapshot = Snapshot::from_pairs([
            (formats::TEXT_PLAIN, b"hello".to_vec()),
            (formats::TEXT_HTML, b"<b>hello</b>".to_vec()),
        ]);
        assert_eq!(
            fingerprint_source(&snapshot).as_deref(),
            Some("<b>hello</b>")
        );
    }

    #[test]
    fn test_urls_take_precedence_over_html() {
        let snapshot = Snapshot::from_pairs([
            (formats::TEXT_HTML, b"<a>x</a>".to_vec()),
            (
                formats::URI_LIST,
                b"file:///tmp/a.txt\r\nfile:///tmp/b.txt\r\n".to_vec(),
            ),
        ]);
        assert_eq!(
            fingerprint_source(&snapshot).as_deref(),
            Some("file:///tmp/a.txt\nfile:///tmp/b.txt")
        );
    }

    #[test]
    fn test_unsupported_content_has_no_fingerprint() {
        let snapshot = Snapshot::from_pairs([("image/png", vec![0x89, 0x50, 0x4e, 0x47])]);
        assert_eq!(fingerprint(&snapshot), None);
        assert_eq!(fingerprint(&Snapshot::default()), None);
    }
}
