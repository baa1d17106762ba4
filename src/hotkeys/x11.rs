//! Listener-thread hotkey backend.
//!
//! global-hotkey grabs the chord on the root window and delivers presses on a
//! process-wide channel. A dedicated thread drains that channel and posts the
//! ids to the core loop; callbacks never run on the listener thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use global_hotkey::{
    hotkey::HotKey, Error as HotkeyError, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use tracing::{debug, info, warn};

use super::HotkeyBackend;
use crate::error::{ClipkeeperError, Result};
use crate::events::CoreMessage;

const LISTENER_POLL: Duration = Duration::from_millis(200);

pub struct X11Hotkeys {
    manager: GlobalHotKeyManager,
    stop: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
}

impl X11Hotkeys {
    pub fn start(sender: Sender<CoreMessage>) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().map_err(|e| ClipkeeperError::HotkeyRegistration {
            chord: String::new(),
            reason: format!("hotkey manager unavailable: {}", e),
        })?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let listener = thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || listen(sender, stop_flag))
            .map_err(|e| ClipkeeperError::HotkeyRegistration {
                chord: String::new(),
                reason: format!("spawn listener: {}", e),
            })?;

        Ok(Self {
            manager,
            stop,
            listener: Some(listener),
        })
    }
}

fn listen(sender: Sender<CoreMessage>, stop: Arc<AtomicBool>) {
    info!("Hotkey listener thread started");
    let receiver = GlobalHotKeyEvent::receiver();

    while !stop.load(Ordering::SeqCst) {
        match receiver.recv_timeout(LISTENER_POLL) {
            Ok(event) if event.state() == HotKeyState::Pressed => {
                if sender.send(CoreMessage::HotkeyPressed(event.id())).is_err() {
                    debug!("Core loop gone, stopping hotkey listener");
                    break;
                }
            }
            Ok(_) => {}
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                warn!(component = "hotkeys", operation = "listen", error = %e);
                break;
            }
        }
    }

    info!("Hotkey listener thread stopped");
}

impl HotkeyBackend for X11Hotkeys {
    fn register(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
        self.manager.register(hotkey)
    }

    fn unregister(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
        self.manager.unregister(hotkey)
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.listener.take() {
            if handle.join().is_err() {
                warn!("Hotkey listener thread panicked");
            }
        }
    }
}

impl Drop for X11Hotkeys {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(all(test, feature = "system-tests"))]
mod tests {
    use super::*;
    use crate::hotkeys::KeyChord;
    use std::sync::mpsc;

    #[test]
    fn test_register_and_release_on_display() {
        let (tx, _rx) = mpsc::channel();
        let mut backend = X11Hotkeys::start(tx).unwrap();
        let hotkey = KeyChord::parse("Ctrl+Alt+Shift+F12").unwrap().to_hotkey();
        backend.register(hotkey).unwrap();
        backend.unregister(hotkey).unwrap();
        backend.shutdown();
        assert!(backend.listener.is_none());
    }
}
