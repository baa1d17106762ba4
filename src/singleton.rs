//! Single-instance guard
//!
//! POSIX: a PID lock file created atomically in the runtime directory. A lock
//! file whose PID is no longer alive (left behind by a crash) is reclaimed.
//! Windows: a named mutex; ERROR_ALREADY_EXISTS means another instance holds it.
//!
//! The guard releases on `destroy()` or drop, and only if this process
//! acquired it.

#[cfg(unix)]
use std::fs::{self, OpenOptions};
#[cfg(unix)]
use std::io::Write;
#[cfg(unix)]
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
#[cfg(unix)]
use crate::error::ClipkeeperError;

/// Lock files with no readable PID younger than this belong to an instance
/// that is still writing it.
#[cfg(unix)]
const EMPTY_LOCK_GRACE: Duration = Duration::from_secs(5);

pub struct SingletonGuard {
    acquired: bool,
    other_pid: Option<u32>,
    #[cfg(unix)]
    lock_path: PathBuf,
    #[cfg(windows)]
    handle: Option<windows::Win32::Foundation::HANDLE>,
}

#[cfg(unix)]
pub fn default_lock_path(name: &str) -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(format!("{}.pid", name))
}

/// Whether `pid` is in the running-process table.
pub fn is_process_running(pid: u32) -> bool {
    let mut system = sysinfo::System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
    system.process(sysinfo::Pid::from_u32(pid)).is_some()
}

impl SingletonGuard {
    /// Try to become the single running instance named `name`.
    pub fn acquire(name: &str) -> Result<Self> {
        #[cfg(unix)]
        {
            Self::acquire_at(default_lock_path(name))
        }
        #[cfg(windows)]
        {
            Ok(Self::acquire_mutex(name))
        }
    }

    #[cfg(unix)]
    pub fn acquire_at(lock_path: PathBuf) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ClipkeeperError::DataDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut guard = Self {
            acquired: false,
            other_pid: None,
            lock_path,
        };

        // Second attempt only after reclaiming a stale lock
        for _ in 0..2 {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&guard.lock_path)
            {
                Ok(mut file) => {
                    let pid = std::process::id();
                    write!(file, "{}", pid).map_err(|source| ClipkeeperError::DataDir {
                        path: guard.lock_path.clone(),
                        source,
                    })?;
                    guard.acquired = true;
                    info!(pid, path = %guard.lock_path.display(), "Acquired instance lock");
                    return Ok(guard);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    match read_pid(&guard.lock_path) {
                        Some(pid) if is_process_running(pid) => {
                            guard.other_pid = Some(pid);
                            return Ok(guard);
                        }
                        Some(pid) => {
                            info!(pid, "Removing stale instance lock");
                        }
                        None if !is_older_than(&guard.lock_path, EMPTY_LOCK_GRACE) => {
                            return Ok(guard);
                        }
                        None => {
                            info!("Removing unreadable instance lock");
                        }
                    }
                    if let Err(e) = fs::remove_file(&guard.lock_path) {
                        warn!(error = %e, "Failed to remove stale instance lock");
                        return Ok(guard);
                    }
                }
                Err(source) => {
                    return Err(ClipkeeperError::DataDir {
                        path: guard.lock_path.clone(),
                        source,
                    });
                }
            }
        }

        Ok(guard)
    }

    #[cfg(windows)]
    fn acquire_mutex(name: &str) -> Self {
        use windows::core::PCWSTR;
        use windows::Win32::Foundation::{CloseHandle, GetLastError, BOOL, ERROR_ALREADY_EXISTS};
        use windows::Win32::System::Threading::CreateMutexW;

        let mut guard = Self {
            acquired: false,
            other_pid: None,
            handle: None,
        };

        let wide: Vec<u16> = format!("Local\\{}", name)
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: wide is NUL-terminated and outlives the call.
        unsafe {
            match CreateMutexW(None, BOOL::from(true), PCWSTR(wide.as_ptr())) {
                Ok(handle) => {
                    if GetLastError() == ERROR_ALREADY_EXISTS {
                        CloseHandle(handle);
                    } else {
                        guard.handle = Some(handle);
                        guard.acquired = true;
                        info!(name, "Acquired instance mutex");
                    }
                }
                Err(e) => warn!(error = %e, "CreateMutexW failed"),
            }
        }
        guard
    }

    /// True when another instance already holds the guard.
    pub fn is_running(&self) -> bool {
        !self.acquired
    }

    /// PID of the other instance, when known.
    pub fn other_pid(&self) -> Option<u32> {
        self.other_pid
    }

    /// Release the guard. Does nothing if it was never acquired or is already
    /// released.
    pub fn destroy(&mut self) {
        if !self.acquired {
            return;
        }
        self.acquired = false;

        #[cfg(unix)]
        {
            // Only remove the file if it still names us
            if read_pid(&self.lock_path) == Some(std::process::id()) {
                match fs::remove_file(&self.lock_path) {
                    Ok(()) => debug!("Instance lock removed"),
                    Err(e) => warn!(error = %e, "Failed to remove instance lock"),
                }
            }
        }

        #[cfg(windows)]
        {
            use windows::Win32::Foundation::CloseHandle;
            if let Some(handle) = self.handle.take() {
                // SAFETY: handle came from CreateMutexW and is closed once.
                unsafe {
                    CloseHandle(handle);
                }
                debug!("Instance mutex released");
            }
        }
    }
}

impl Drop for SingletonGuard {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(unix)]
fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn is_older_than(path: &Path, age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|elapsed| elapsed >= age)
        .unwrap_or(true)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lock_path(dir: &TempDir) -> PathBuf {
        dir.path().join("clipkeeper.pid")
    }

    #[test]
    fn test_first_acquire_writes_own_pid() {
        let dir = TempDir::new().unwrap();
        let guard = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        assert!(!guard.is_running());
        assert_eq!(read_pid(&lock_path(&dir)), Some(std::process::id()));
    }

    #[test]
    fn test_second_acquire_sees_running_instance() {
        let dir = TempDir::new().unwrap();
        let _first = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        let second = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        assert!(second.is_running());
        assert_eq!(second.other_pid(), Some(std::process::id()));
    }

    #[test]
    fn test_loser_never_deletes_lock() {
        let dir = TempDir::new().unwrap();
        let _first = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        {
            let mut second = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
            second.destroy();
        }
        assert!(lock_path(&dir).exists());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut guard = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        guard.destroy();
        assert!(!lock_path(&dir).exists());
        guard.destroy();
        assert!(!lock_path(&dir).exists());
    }

    #[test]
    fn test_drop_releases_lock() {
        let dir = TempDir::new().unwrap();
        {
            let _guard = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        }
        assert!(!lock_path(&dir).exists());
        let again = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        assert!(!again.is_running());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        // PIDs this large are beyond pid_max on Linux
        fs::write(lock_path(&dir), "4000000000").unwrap();
        let guard = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        assert!(!guard.is_running());
        assert_eq!(read_pid(&lock_path(&dir)), Some(std::process::id()));
    }

    #[test]
    fn test_fresh_empty_lock_counts_as_running() {
        let dir = TempDir::new().unwrap();
        fs::write(lock_path(&dir), "").unwrap();
        let guard = SingletonGuard::acquire_at(lock_path(&dir)).unwrap();
        assert!(guard.is_running());
        assert_eq!(guard.other_pid(), None);
    }
}
