//! Events exchanged between the core loop, its background threads and the UI.

use crate::clipboard::Snapshot;
use crate::clipboard_history::EntryId;

/// Events dispatched synchronously on the core thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A clipboard snapshot to ingest.
    NewItem(Snapshot),
    /// Re-publish a stored entry to the clipboard.
    SetClipboard(EntryId),
    OpenSettings,
    ToggleWindow,
    OpenPreview(EntryId),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewItem(_) => "newItem",
            Self::SetClipboard(_) => "setClipboard",
            Self::OpenSettings => "openSettings",
            Self::ToggleWindow => "toggleWindow",
            Self::OpenPreview(_) => "openPreview",
        }
    }
}

/// Messages posted into the core queue. Background threads only ever send
/// these; they never touch controller, store or observer state.
#[derive(Debug)]
pub enum CoreMessage {
    /// The OS reported a clipboard change; the core reads the snapshot itself.
    ClipboardChanged,
    /// A registered hotkey fired (global-hotkey id).
    HotkeyPressed(u32),
    Event(Event),
    Shutdown,
}
