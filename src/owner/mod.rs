//! Clipboard owner resolution
//!
//! Best-effort names for the application that owns the clipboard: binary file
//! name, window title, window class. Every failure yields an empty set, which
//! the exclusion check treats as "not excluded".

#[cfg(windows)]
mod win32;
#[cfg(all(unix, not(target_os = "macos")))]
mod x11;

use std::collections::BTreeSet;

/// Identifying strings for one owner.
pub type OwnerNames = BTreeSet<String>;

pub enum OwnerResolver {
    #[cfg(all(unix, not(target_os = "macos")))]
    X11,
    #[cfg(windows)]
    Win32,
    Unsupported,
}

impl OwnerResolver {
    pub fn detect() -> Self {
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            if std::env::var_os("DISPLAY").is_some() {
                Self::X11
            } else {
                Self::Unsupported
            }
        }
        #[cfg(windows)]
        {
            Self::Win32
        }
        #[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
        {
            Self::Unsupported
        }
    }

    pub fn current_owner_names(&self) -> OwnerNames {
        let names = match self {
            #[cfg(all(unix, not(target_os = "macos")))]
            Self::X11 => x11::active_window_names(),
            #[cfg(windows)]
            Self::Win32 => win32::clipboard_owner_names(),
            Self::Unsupported => OwnerNames::new(),
        };
        tracing::trace!(owners = ?names, "Resolved clipboard owner");
        names
    }
}

/// Add `name` unless it is blank.
pub(crate) fn push_name(names: &mut OwnerNames, name: impl AsRef<str>) {
    let name = name.as_ref().trim();
    if !name.is_empty() {
        names.insert(name.to_string());
    }
}
