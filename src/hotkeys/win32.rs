//! Message-pump hotkey backend.
//!
//! RegisterHotKey delivers WM_HOTKEY to the thread that created the manager's
//! hidden window, which is the core thread. `poll` pumps that queue and drains
//! the presses global-hotkey translated from it.

use global_hotkey::{
    hotkey::HotKey, Error as HotkeyError, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
};

use super::HotkeyBackend;
use crate::error::{ClipkeeperError, Result};

pub struct Win32Hotkeys {
    manager: GlobalHotKeyManager,
}

impl Win32Hotkeys {
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new().map_err(|e| ClipkeeperError::HotkeyRegistration {
            chord: String::new(),
            reason: format!("hotkey manager unavailable: {}", e),
        })?;
        Ok(Self { manager })
    }
}

fn pump_messages() {
    let mut msg = MSG::default();
    // SAFETY: msg is a valid out-pointer for the duration of each call.
    unsafe {
        while PeekMessageW(&mut msg, HWND(0), 0, 0, PM_REMOVE).as_bool() {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

impl HotkeyBackend for Win32Hotkeys {
    fn register(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
        self.manager.register(hotkey)
    }

    fn unregister(&mut self, hotkey: HotKey) -> std::result::Result<(), HotkeyError> {
        self.manager.unregister(hotkey)
    }

    fn poll(&mut self) -> Vec<u32> {
        pump_messages();
        let receiver = GlobalHotKeyEvent::receiver();
        std::iter::from_fn(|| receiver.try_recv().ok())
            .filter(|event| event.state() == HotKeyState::Pressed)
            .map(|event| event.id())
            .collect()
    }
}
