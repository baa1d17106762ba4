//! Global hotkey management
//!
//! One binding per window handle. Registering on a handle that already has a
//! binding replaces it, so changing the chord in settings never leaves the old
//! one active.
//!
//! ## Module Structure
//! - `chord`: parsing "Ctrl+Shift+H" style strings
//! - `x11`: listener-thread backend (events posted to the core loop)
//! - `win32`: message-pump backend (events drained on the core thread)

mod chord;
#[cfg(not(windows))]
mod x11;
#[cfg(windows)]
mod win32;

use std::collections::HashMap;
use std::sync::mpsc::Sender;

use global_hotkey::{hotkey::HotKey, Error as HotkeyError};
use tracing::{debug, info, warn};

pub use chord::{ChordParseError, KeyChord, ModifierMask};

use crate::error::Result;
use crate::events::CoreMessage;

/// Opaque owner of a binding (the main window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    pub const MAIN: WindowHandle = WindowHandle(0);
}

/// OS side of hotkey registration.
pub trait HotkeyBackend {
    fn register(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError>;
    fn unregister(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError>;

    /// Ids pressed since the last poll, for backends that deliver on the
    /// calling thread. Listener-thread backends post to the core loop instead.
    fn poll(&mut self) -> Vec<u32> {
        Vec::new()
    }

    /// Release platform resources. Called once, after every binding is gone.
    fn shutdown(&mut self) {}
}

/// Platform backend chosen at startup.
pub enum PlatformHotkeys {
    #[cfg(not(windows))]
    X11(x11::X11Hotkeys),
    #[cfg(windows)]
    Win32(win32::Win32Hotkeys),
}

impl PlatformHotkeys {
    /// Pick the backend for this platform. Presses are posted to `sender` by
    /// listener-thread backends.
    pub fn detect(sender: Sender<CoreMessage>) -> Result<Self> {
        #[cfg(not(windows))]
        {
            x11::X11Hotkeys::start(sender).map(Self::X11)
        }
        #[cfg(windows)]
        {
            let _ = sender;
            win32::Win32Hotkeys::new().map(Self::Win32)
        }
    }
}

impl HotkeyBackend for PlatformHotkeys {
    fn register(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
        match self {
            #[cfg(not(windows))]
            Self::X11(backend) => backend.register(hotkey),
            #[cfg(windows)]
            Self::Win32(backend) => backend.register(hotkey),
        }
    }

    fn unregister(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
        match self {
            #[cfg(not(windows))]
            Self::X11(backend) => backend.unregister(hotkey),
            #[cfg(windows)]
            Self::Win32(backend) => backend.unregister(hotkey),
        }
    }

    fn poll(&mut self) -> Vec<u32> {
        match self {
            #[cfg(not(windows))]
            Self::X11(backend) => backend.poll(),
            #[cfg(windows)]
            Self::Win32(backend) => backend.poll(),
        }
    }

    fn shutdown(&mut self) {
        match self {
            #[cfg(not(windows))]
            Self::X11(backend) => backend.shutdown(),
            #[cfg(windows)]
            Self::Win32(backend) => backend.shutdown(),
        }
    }
}

struct Binding {
    hotkey: HotKey,
    chord: KeyChord,
    callback: Box<dyn FnMut()>,
}

pub struct HotkeyManager<B: HotkeyBackend> {
    backend: B,
    bindings: HashMap<WindowHandle, Binding>,
    shut_down: bool,
}

impl<B: HotkeyBackend> HotkeyManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            bindings: HashMap::new(),
            shut_down: false,
        }
    }

    /// Bind `chord` to `callback` for `window`, replacing any previous binding
    /// on that handle. Returns false if the chord doesn't parse or the OS
    /// refuses it.
    pub fn register(
        &mut self,
        chord: &str,
        callback: impl FnMut() + 'static,
        window: WindowHandle,
    ) -> bool {
        self.unregister(window);

        let chord = match KeyChord::parse(chord) {
            Ok(chord) => chord,
            Err(e) => {
                warn!(component = "hotkeys", operation = "parse", chord, error = %e, "Invalid hotkey");
                return false;
            }
        };

        let hotkey = chord.to_hotkey();
        if let Err(e) = self.backend.register(hotkey) {
            warn!(
                component = "hotkeys",
                operation = "register",
                error = %format_hotkey_error(&e, &chord.to_string()),
            );
            return false;
        }

        info!(chord = %chord, id = hotkey.id(), "Registered global hotkey");
        self.bindings.insert(
            window,
            Binding {
                hotkey,
                chord,
                callback: Box::new(callback),
            },
        );
        true
    }

    /// Remove the binding for `window`. No-op when there is none.
    pub fn unregister(&mut self, window: WindowHandle) {
        let Some(binding) = self.bindings.remove(&window) else {
            return;
        };
        match self.backend.unregister(binding.hotkey) {
            Ok(()) => debug!(chord = %binding.chord, "Unregistered global hotkey"),
            Err(e) => warn!(
                component = "hotkeys",
                operation = "unregister",
                chord = %binding.chord,
                error = %e,
            ),
        }
    }

    /// Run the callback bound to hotkey `id`. Returns false for unknown ids.
    pub fn dispatch(&mut self, id: u32) -> bool {
        match self
            .bindings
            .values_mut()
            .find(|binding| binding.hotkey.id() == id)
        {
            Some(binding) => {
                debug!(chord = %binding.chord, "Hotkey pressed");
                (binding.callback)();
                true
            }
            None => false,
        }
    }

    /// Dispatch presses collected by a polling backend.
    pub fn pump(&mut self) {
        for id in self.backend.poll() {
            self.dispatch(id);
        }
    }

    pub fn chord_for(&self, window: WindowHandle) -> Option<&KeyChord> {
        self.bindings.get(&window).map(|binding| &binding.chord)
    }

    /// Unregister everything and release the backend. Safe to call twice.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        let windows: Vec<WindowHandle> = self.bindings.keys().copied().collect();
        for window in windows {
            self.unregister(window);
        }
        self.backend.shutdown();
        self.shut_down = true;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: HotkeyBackend> Drop for HotkeyManager<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Format a hotkey registration error into a user-facing message.
fn format_hotkey_error(e: &HotkeyError, shortcut_display: &str) -> String {
    match e {
        HotkeyError::AlreadyRegistered(hk) => format!(
            "Hotkey '{}' is already registered by another application (ID: {}). \
             Try a different shortcut or close the conflicting app.",
            shortcut_display,
            hk.id()
        ),
        HotkeyError::FailedToRegister(msg) => format!(
            "System rejected hotkey '{}': {}. The window manager may reserve this shortcut.",
            shortcut_display, msg
        ),
        HotkeyError::OsError(os_err) => format!(
            "OS error registering '{}': {}. Check system hotkey settings.",
            shortcut_display, os_err
        ),
        other => format!(
            "Failed to register hotkey '{}': {}",
            shortcut_display, other
        ),
    }
}
