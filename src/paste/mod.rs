//! Paste injection
//!
//! Synthesizes Ctrl+V into the focused window after an entry is re-published.
//! Always best-effort: failures are logged and never reach the caller.

#[cfg(windows)]
mod win32;
#[cfg(all(unix, not(target_os = "macos")))]
mod x11;

use tracing::{debug, warn};

pub enum PasteInjector {
    #[cfg(all(unix, not(target_os = "macos")))]
    X11,
    #[cfg(windows)]
    Win32,
    Disabled,
}

impl PasteInjector {
    pub fn detect() -> Self {
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            if std::env::var_os("DISPLAY").is_some() {
                Self::X11
            } else {
                Self::Disabled
            }
        }
        #[cfg(windows)]
        {
            Self::Win32
        }
        #[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
        {
            Self::Disabled
        }
    }

    /// Send Ctrl+V to whatever window has focus.
    pub fn send_paste(&self) {
        let result = match self {
            #[cfg(all(unix, not(target_os = "macos")))]
            Self::X11 => x11::send_paste(),
            #[cfg(windows)]
            Self::Win32 => win32::send_paste(),
            Self::Disabled => {
                debug!("Paste injection disabled");
                return;
            }
        };

        match result {
            Ok(()) => debug!("Paste keystroke sent"),
            Err(e) => warn!(component = "paste", operation = "send_paste", error = %e),
        }
    }
}
