//! Core event loop
//!
//! Owns the controller, store, observer and hotkey manager on one thread.
//! Background threads (clipboard watcher, hotkey listener) only post
//! [`CoreMessage`]s; everything that touches state happens here, one message
//! at a time.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clipboard::{
    ClipboardBackend, ClipboardMonitor, ClipboardObserver, ObserverEvent, SystemClipboard,
};
use crate::clipboard_history::{get_db_path, HistoryController, HistorySettings, HistoryStore, HistoryView};
use crate::config::{save_config, Config};
use crate::error::{ClipkeeperError, Result, ResultExt};
use crate::events::{CoreMessage, Event};
use crate::hotkeys::{HotkeyBackend, HotkeyManager, KeyChord, PlatformHotkeys, WindowHandle};
use crate::owner::{OwnerNames, OwnerResolver};
use crate::paste::PasteInjector;

/// Wake-up interval for housekeeping (ignore-guard expiry, message pump).
const TICK: Duration = Duration::from_millis(100);

pub struct Core<B: ClipboardBackend, H: HotkeyBackend = PlatformHotkeys> {
    controller: HistoryController<B>,
    hotkeys: Option<HotkeyManager<H>>,
    owners: OwnerResolver,
    monitor: Option<ClipboardMonitor>,
    config: Config,
    config_path: PathBuf,
    sender: Sender<CoreMessage>,
    receiver: Receiver<CoreMessage>,
}

impl Core<SystemClipboard> {
    /// Open the store and the OS clipboard. Nothing is watched until
    /// [`Core::start_platform`].
    pub fn open(
        config: Config,
        config_path: PathBuf,
        data_dir: &Path,
        view: Box<dyn HistoryView>,
    ) -> Result<Self> {
        let store = HistoryStore::open(&get_db_path(data_dir)?)?;
        let observer = ClipboardObserver::new(SystemClipboard::new()?, config.private_mode);
        let controller = HistoryController::new(
            store,
            observer,
            PasteInjector::detect(),
            view,
            HistorySettings::from(&config),
        );
        Ok(Self::new(controller, OwnerResolver::detect(), config, config_path))
    }

    /// Start the clipboard watcher and bind the global hotkey.
    ///
    /// Either may fail (no display, chord taken); the core keeps running
    /// without it.
    pub fn start_platform(&mut self) {
        match ClipboardMonitor::start(self.sender.clone()) {
            Ok(monitor) => self.monitor = Some(monitor),
            Err(e) => warn!(component = "core", operation = "start_monitor", error = %e),
        }

        match PlatformHotkeys::detect(self.sender.clone()) {
            Ok(backend) => {
                self.hotkeys = Some(HotkeyManager::new(backend));
                if let Err(e) = self.register_hotkey() {
                    warn!(component = "core", reason = %e.user_message(), "Global hotkey unavailable");
                }
            }
            Err(e) => warn!(component = "core", operation = "start_hotkeys", error = %e),
        }
    }
}

impl<B: ClipboardBackend, H: HotkeyBackend> Core<B, H> {
    pub fn new(
        controller: HistoryController<B>,
        owners: OwnerResolver,
        config: Config,
        config_path: PathBuf,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            controller,
            hotkeys: None,
            owners,
            monitor: None,
            config,
            config_path,
            sender,
            receiver,
        }
    }

    pub fn with_hotkeys(mut self, backend: H) -> Self {
        self.hotkeys = Some(HotkeyManager::new(backend));
        self
    }

    /// Handle for posting messages from other threads.
    pub fn sender(&self) -> Sender<CoreMessage> {
        self.sender.clone()
    }

    pub fn controller(&self) -> &HistoryController<B> {
        &self.controller
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind the configured chord so that pressing it toggles the window.
    pub fn register_hotkey(&mut self) -> Result<()> {
        let chord_text = self.config.global_hotkey.clone();
        KeyChord::parse(&chord_text)?;

        let Some(hotkeys) = self.hotkeys.as_mut() else {
            return Err(ClipkeeperError::HotkeyRegistration {
                chord: chord_text,
                reason: "no hotkey backend".to_string(),
            });
        };

        let sender = self.sender.clone();
        let toggle = move || {
            if sender.send(CoreMessage::Event(Event::ToggleWindow)).is_err() {
                debug!("Core loop gone, dropping toggle");
            }
        };

        if hotkeys.register(&chord_text, toggle, WindowHandle::MAIN) {
            Ok(())
        } else {
            Err(ClipkeeperError::HotkeyRegistration {
                chord: chord_text,
                reason: "refused by the system".to_string(),
            })
        }
    }

    /// Change the global hotkey; the previous binding is released first.
    pub fn set_global_hotkey(&mut self, chord: &str) -> Result<()> {
        self.config.global_hotkey = chord.to_string();
        self.register_hotkey()
    }

    pub fn set_private_mode(&mut self, enabled: bool) {
        self.config.set_private_mode(enabled);
        self.controller.set_private_mode(enabled);
    }

    /// Process messages until `stop` is set or a Shutdown message arrives.
    pub fn run(&mut self, stop: &AtomicBool) {
        info!("Core loop started");
        while !stop.load(Ordering::SeqCst) {
            match self.receiver.recv_timeout(TICK) {
                Ok(CoreMessage::Shutdown) => break,
                Ok(message) => self.handle(message),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.tick();
        }
        info!("Core loop stopped");
    }

    /// Process everything already queued, without waiting.
    pub fn drain(&mut self) {
        while let Ok(message) = self.receiver.try_recv() {
            self.handle(message);
        }
    }

    fn tick(&mut self) {
        self.controller.expire_ignore_guard();
        if let Some(hotkeys) = self.hotkeys.as_mut() {
            hotkeys.pump();
        }
    }

    pub fn handle(&mut self, message: CoreMessage) {
        match message {
            CoreMessage::ClipboardChanged => self.on_clipboard_changed(),
            CoreMessage::HotkeyPressed(id) => {
                if let Some(hotkeys) = self.hotkeys.as_mut() {
                    hotkeys.dispatch(id);
                }
            }
            CoreMessage::Event(event) => self.dispatch(event),
            CoreMessage::Shutdown => {}
        }
    }

    fn on_clipboard_changed(&mut self) {
        let Some(event) = self.controller.observer_mut().on_change() else {
            return;
        };
        if let ObserverEvent::OwnershipLost(_) = event {
            debug!("Re-ingesting contents of a vanished clipboard owner");
        }
        self.dispatch(Event::NewItem(event.into_snapshot()));
    }

    /// Dispatch one event synchronously.
    pub fn dispatch(&mut self, event: Event) {
        debug!(event = event.name(), "Dispatching event");
        match event {
            Event::NewItem(snapshot) => {
                let owners = self.resolve_owners();
                let outcome = self.controller.on_snapshot(&snapshot, &owners);
                debug!(?outcome, "Snapshot processed");
            }
            Event::SetClipboard(entry_id) => {
                if !self.controller.apply(entry_id) {
                    debug!(id = entry_id, "Entry not applied");
                }
            }
            other => self.controller.view_mut().on_event(&other),
        }
    }

    fn resolve_owners(&self) -> OwnerNames {
        // The owner only matters when something could be excluded
        if self.controller.settings().excluded_apps.is_empty() || self.controller.is_ignoring_next()
        {
            return OwnerNames::new();
        }
        self.owners.current_owner_names()
    }

    /// Exit sequence: release the hotkey, stop watching, flush and compact the
    /// store, then persist settings. The singleton guard is released by the
    /// caller afterwards.
    pub fn shutdown(mut self) -> Result<()> {
        info!("Shutting down");
        if let Some(mut hotkeys) = self.hotkeys.take() {
            hotkeys.shutdown();
        }
        if let Some(mut monitor) = self.monitor.take() {
            monitor.stop();
        }

        // Handle anything posted before the watcher stopped
        self.drain();

        self.controller.store().checkpoint().log_err();
        let closed = self.controller.close();

        save_config(&self.config, &self.config_path)
            .map_err(|e| ClipkeeperError::Config(format!("{:#}", e)))
            .log_err();

        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{formats, MemoryClipboard, Snapshot};
    use crate::clipboard_history::LogView;
    use crate::config::load_config;
    use global_hotkey::hotkey::HotKey;
    use global_hotkey::Error as HotkeyError;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeHotkeys {
        active: HashSet<u32>,
    }

    impl HotkeyBackend for FakeHotkeys {
        fn register(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
            self.active.insert(hotkey.id());
            Ok(())
        }

        fn unregister(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
            self.active.remove(&hotkey.id());
            Ok(())
        }
    }

    fn text(s: &str) -> Snapshot {
        Snapshot::from_pairs([(formats::TEXT_PLAIN, s.as_bytes().to_vec())])
    }

    fn create_test_core(
        dir: &TempDir,
        config: Config,
    ) -> (Core<MemoryClipboard, FakeHotkeys>, MemoryClipboard) {
        let clipboard = MemoryClipboard::new();
        let controller = HistoryController::new(
            HistoryStore::open(&dir.path().join("contents.db")).unwrap(),
            ClipboardObserver::new(clipboard.clone(), config.private_mode),
            PasteInjector::Disabled,
            Box::new(LogView),
            HistorySettings {
                send_paste: false,
                ..HistorySettings::from(&config)
            },
        );
        let core = Core::new(
            controller,
            OwnerResolver::Unsupported,
            config,
            dir.path().join("settings.json"),
        )
        .with_hotkeys(FakeHotkeys::default());
        (core, clipboard)
    }

    #[test]
    fn test_clipboard_change_creates_entry() {
        let dir = TempDir::new().unwrap();
        let (mut core, clipboard) = create_test_core(&dir, Config::default());

        clipboard.set_contents(text("hello"));
        core.handle(CoreMessage::ClipboardChanged);
        core.handle(CoreMessage::ClipboardChanged);

        assert_eq!(core.controller().store().count_entries().unwrap(), 1);
    }

    #[test]
    fn test_set_clipboard_event_does_not_duplicate() {
        let dir = TempDir::new().unwrap();
        let (mut core, clipboard) = create_test_core(&dir, Config::default());

        clipboard.set_contents(text("first"));
        core.handle(CoreMessage::ClipboardChanged);
        clipboard.set_contents(text("second"));
        core.handle(CoreMessage::ClipboardChanged);

        let first = core.controller().store().list_entries().unwrap()[1].id;
        std::thread::sleep(Duration::from_millis(5));
        core.dispatch(Event::SetClipboard(first));
        assert_eq!(clipboard.contents(), text("first"));

        // The write we just made comes back as a change notification
        core.handle(CoreMessage::ClipboardChanged);
        assert_eq!(core.controller().store().count_entries().unwrap(), 2);
        assert_eq!(core.controller().store().list_entries().unwrap()[0].id, first);
    }

    #[test]
    fn test_hotkey_press_posts_toggle() {
        let dir = TempDir::new().unwrap();
        let (mut core, _) = create_test_core(&dir, Config::default());
        core.register_hotkey().unwrap();

        let id = KeyChord::parse("<CTRL><ALT>H").unwrap().to_hotkey().id();
        core.handle(CoreMessage::HotkeyPressed(id));

        match core.receiver.try_recv() {
            Ok(CoreMessage::Event(Event::ToggleWindow)) => {}
            other => panic!("expected ToggleWindow, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_hotkey_reports_chord_error() {
        let dir = TempDir::new().unwrap();
        let (mut core, _) = create_test_core(&dir, Config::default());
        let err = core.set_global_hotkey("Hyper+Q").unwrap_err();
        assert!(matches!(err, ClipkeeperError::Chord(_)));
    }

    #[test]
    fn test_private_mode_skips_capture() {
        let dir = TempDir::new().unwrap();
        let (mut core, clipboard) = create_test_core(&dir, Config::default());
        core.set_private_mode(true);

        clipboard.set_contents(text("secret"));
        core.handle(CoreMessage::ClipboardChanged);
        assert_eq!(core.controller().store().count_entries().unwrap(), 0);
        assert!(core.config().private_mode);
    }

    #[test]
    fn test_run_stops_on_shutdown_message() {
        let dir = TempDir::new().unwrap();
        let (mut core, clipboard) = create_test_core(&dir, Config::default());
        let sender = core.sender();

        clipboard.set_contents(text("queued"));
        sender.send(CoreMessage::ClipboardChanged).unwrap();
        sender.send(CoreMessage::Shutdown).unwrap();

        core.run(&AtomicBool::new(false));
        assert_eq!(core.controller().store().count_entries().unwrap(), 1);
    }

    #[test]
    fn test_shutdown_persists_config() {
        let dir = TempDir::new().unwrap();
        let (mut core, _) = create_test_core(&dir, Config::default());
        core.set_private_mode(true);
        core.shutdown().unwrap();

        let saved = load_config(&dir.path().join("settings.json"));
        assert!(saved.private_mode);
    }
}
