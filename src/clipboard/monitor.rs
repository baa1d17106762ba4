//! Clipboard monitoring
//!
//! Background thread that waits for native clipboard change notifications and
//! forwards them to the core loop. Reading the clipboard happens on the core
//! thread, not here.

use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use clipboard_rs::{ClipboardHandler, ClipboardWatcher, ClipboardWatcherContext, WatcherShutdown};
use tracing::{debug, info};

use crate::error::{ClipkeeperError, Result};
use crate::events::CoreMessage;

struct ChangeForwarder {
    sender: Sender<CoreMessage>,
}

impl ClipboardHandler for ChangeForwarder {
    fn on_clipboard_change(&mut self) {
        if self.sender.send(CoreMessage::ClipboardChanged).is_err() {
            debug!("Core loop gone, dropping clipboard change notification");
        }
    }
}

/// Handle to the running watcher thread. Stops and joins on drop.
pub struct ClipboardMonitor {
    shutdown: Option<WatcherShutdown>,
    handle: Option<JoinHandle<()>>,
}

impl ClipboardMonitor {
    /// Start watching for clipboard changes on a dedicated thread.
    pub fn start(sender: Sender<CoreMessage>) -> Result<Self> {
        let mut watcher = ClipboardWatcherContext::new()
            .map_err(|e| ClipkeeperError::Clipboard(format!("watcher: {}", e)))?;

        let shutdown = watcher
            .add_handler(ChangeForwarder { sender })
            .get_shutdown_channel();

        let handle = thread::Builder::new()
            .name("clipboard-monitor".into())
            .spawn(move || {
                info!("Clipboard monitor thread started");
                watcher.start_watch();
                info!("Clipboard monitor thread stopped");
            })
            .map_err(|e| ClipkeeperError::Clipboard(format!("spawn monitor: {}", e)))?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Stop the watcher and wait for its thread. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.stop();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("Clipboard monitor thread panicked");
            }
        }
    }
}

impl Drop for ClipboardMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
