//! Clipboard observer
//!
//! Wraps a clipboard backend into a source of snapshots and a sink for
//! "set contents" requests. All calls happen on the core thread; the monitor
//! thread only tells the core loop that something changed.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::Snapshot;
use crate::error::Result;

/// Platform clipboard access used by [`ClipboardObserver`].
pub trait ClipboardBackend {
    /// Read every available format the backend understands.
    fn read(&mut self) -> Result<Snapshot>;
    /// Replace the clipboard contents with the given formats.
    fn write(&mut self, snapshot: &Snapshot) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    /// True on windowing systems where the selection dies with its owner
    /// (X11), so the last seen contents must be cached.
    fn tracks_ownership(&self) -> bool {
        false
    }
}

/// What a change notification turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    /// New contents were published by some application.
    Changed(Snapshot),
    /// The owning application went away; carries the last contents seen.
    OwnershipLost(Snapshot),
}

impl ObserverEvent {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Self::Changed(snapshot) | Self::OwnershipLost(snapshot) => snapshot,
        }
    }

    pub fn into_snapshot(self) -> Snapshot {
        match self {
            Self::Changed(snapshot) | Self::OwnershipLost(snapshot) => snapshot,
        }
    }
}

pub struct ClipboardObserver<B: ClipboardBackend> {
    backend: B,
    private_mode: bool,
    last_snapshot: Option<Snapshot>,
}

impl<B: ClipboardBackend> ClipboardObserver<B> {
    pub fn new(backend: B, private_mode: bool) -> Self {
        Self {
            backend,
            private_mode,
            last_snapshot: None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.private_mode
    }

    pub fn set_private_mode(&mut self, enabled: bool) {
        if enabled {
            self.last_snapshot = None;
        }
        self.private_mode = enabled;
        debug!(private_mode = enabled, "Clipboard private mode changed");
    }

    /// Current clipboard contents.
    pub fn get_snapshot(&mut self) -> Result<Snapshot> {
        self.backend.read()
    }

    /// Publish the allow-listed formats of `snapshot`.
    ///
    /// Returns `Ok(false)` when nothing was written (private mode, or no
    /// allow-listed format present).
    pub fn set_snapshot(&mut self, snapshot: &Snapshot) -> Result<bool> {
        if self.private_mode {
            debug!("Private mode enabled, not publishing clipboard contents");
            return Ok(false);
        }

        let allowed = snapshot.allowed();
        if allowed.is_empty() {
            debug!(
                formats = snapshot.len(),
                "Snapshot has no publishable formats"
            );
            return Ok(false);
        }

        self.backend.write(&allowed)?;
        self.last_snapshot = Some(allowed);
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<bool> {
        if self.private_mode {
            return Ok(false);
        }
        self.backend.clear()?;
        self.last_snapshot = None;
        Ok(true)
    }

    /// Turn a change notification into an event.
    ///
    /// An empty clipboard right after content was seen means the owner exited
    /// on a backend that tracks ownership; the cached contents are re-emitted.
    pub fn on_change(&mut self) -> Option<ObserverEvent> {
        let snapshot = match self.backend.read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    component = "observer",
                    operation = "read",
                    error = %e,
                    "Failed to read clipboard after change"
                );
                return None;
            }
        };

        if snapshot.is_empty() {
            if self.backend.tracks_ownership() {
                if let Some(cached) = self.last_snapshot.clone() {
                    debug!(formats = cached.len(), "Clipboard owner gone, re-emitting cache");
                    return Some(ObserverEvent::OwnershipLost(cached));
                }
            }
            return None;
        }

        if !self.private_mode {
            self.last_snapshot = Some(snapshot.allowed());
        }
        Some(ObserverEvent::Changed(snapshot))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// In-process clipboard backend.
///
/// Clones share the same contents, so one handle can play "another
/// application" while the observer owns the other. Also used when no OS
/// clipboard is reachable.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Snapshot>>,
    owner_tracking: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave like an X11 selection that empties when its owner exits.
    pub fn with_owner_tracking(mut self) -> Self {
        self.owner_tracking = true;
        self
    }

    /// Replace contents as if another application copied something.
    pub fn set_contents(&self, snapshot: Snapshot) {
        *self.contents.lock() = snapshot;
    }

    pub fn contents(&self) -> Snapshot {
        self.contents.lock().clone()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn read(&mut self) -> Result<Snapshot> {
        Ok(self.contents.lock().clone())
    }

    fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        *self.contents.lock() = snapshot.clone();
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        *self.contents.lock() = Snapshot::new();
        Ok(())
    }

    fn tracks_ownership(&self) -> bool {
        self.owner_tracking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::formats;

    fn text(s: &str) -> Snapshot {
        Snapshot::from_pairs([(formats::TEXT_PLAIN, s.as_bytes().to_vec())])
    }

    #[test]
    fn test_set_snapshot_filters_to_allow_list() {
        let clipboard = MemoryClipboard::new();
        let mut observer = ClipboardObserver::new(clipboard.clone(), false);

        let snapshot = Snapshot::from_pairs([
            (formats::TEXT_PLAIN, b"hi".to_vec()),
            ("image/png", vec![0, 1, 2]),
        ]);
        assert!(observer.set_snapshot(&snapshot).unwrap());
        assert_eq!(clipboard.contents(), text("hi"));
    }

    #[test]
    fn test_private_mode_blocks_writes() {
        let clipboard = MemoryClipboard::new();
        clipboard.set_contents(text("before"));
        let mut observer = ClipboardObserver::new(clipboard.clone(), true);

        assert!(!observer.set_snapshot(&text("after")).unwrap());
        assert!(!observer.clear().unwrap());
        assert_eq!(clipboard.contents(), text("before"));
    }

    #[test]
    fn test_private_mode_still_observes() {
        let clipboard = MemoryClipboard::new();
        let mut observer = ClipboardObserver::new(clipboard.clone(), true);
        clipboard.set_contents(text("secret"));
        assert_eq!(
            observer.on_change(),
            Some(ObserverEvent::Changed(text("secret")))
        );
    }

    #[test]
    fn test_on_change_empty_without_ownership_tracking() {
        let clipboard = MemoryClipboard::new();
        let mut observer = ClipboardObserver::new(clipboard.clone(), false);
        clipboard.set_contents(text("one"));
        assert!(observer.on_change().is_some());

        clipboard.set_contents(Snapshot::new());
        assert_eq!(observer.on_change(), None);
    }

    #[test]
    fn test_ownership_lost_re_emits_last_snapshot() {
        let clipboard = MemoryClipboard::new().with_owner_tracking();
        let mut observer = ClipboardObserver::new(clipboard.clone(), false);

        clipboard.set_contents(text("from editor"));
        assert_eq!(
            observer.on_change(),
            Some(ObserverEvent::Changed(text("from editor")))
        );

        // Editor exits and takes the selection with it
        clipboard.set_contents(Snapshot::new());
        assert_eq!(
            observer.on_change(),
            Some(ObserverEvent::OwnershipLost(text("from editor")))
        );
    }

    #[test]
    fn test_clear_empties_backend() {
        let clipboard = MemoryClipboard::new();
        clipboard.set_contents(text("x"));
        let mut observer = ClipboardObserver::new(clipboard.clone(), false);
        assert!(observer.clear().unwrap());
        assert!(clipboard.contents().is_empty());
    }
}
