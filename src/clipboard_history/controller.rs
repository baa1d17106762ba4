//! History controller
//!
//! Turns clipboard snapshots into stored entries and stored entries back into
//! clipboard contents. Owns the business rules: exclusion, dedup by checksum,
//! the ignore-next guard around its own clipboard writes, and retention.
//!
//! Every operation runs on the core thread. Storage failures are logged and
//! turn the operation into a no-op; nothing here brings the process down.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::database::HistoryStore;
use super::titles;
use super::types::EntryId;
use crate::checksum::fingerprint;
use crate::clipboard::{ClipboardBackend, ClipboardObserver, Snapshot};
use crate::config::Config;
use crate::error::{ResultExt, Result};
use crate::events::Event;
use crate::owner::OwnerNames;
use crate::paste::PasteInjector;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// How long the ignore-next guard waits for the change notification caused
/// by `apply` before it clears itself.
pub const IGNORE_NEXT_TIMEOUT: Duration = Duration::from_secs(2);

/// UI list projection. The controller calls `refresh` after every mutation;
/// the view pulls rows from the store itself.
pub trait HistoryView {
    fn refresh(&mut self);

    /// UI-only events (toggle window, settings, preview).
    fn on_event(&mut self, _event: &Event) {}
}

/// View used when no UI is attached: just logs.
#[derive(Debug, Default)]
pub struct LogView;

impl HistoryView for LogView {
    fn refresh(&mut self) {
        debug!("History changed");
    }

    fn on_event(&mut self, event: &Event) {
        info!(event = event.name(), "UI event with no window attached");
    }
}

/// Controller-relevant subset of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySettings {
    pub lines_to_display: usize,
    /// 0 = unlimited
    pub max_entries: usize,
    /// 0 = never expire
    pub expire_days: u32,
    /// Lowercase application names
    pub excluded_apps: Vec<String>,
    pub send_paste: bool,
}

impl From<&Config> for HistorySettings {
    fn from(config: &Config) -> Self {
        Self {
            lines_to_display: config.lines_to_display,
            max_entries: config.max_entries,
            expire_days: config.expire_days,
            excluded_apps: config.excluded_apps(),
            send_paste: config.send_paste,
        }
    }
}

/// Why a snapshot produced no store change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    PrivateMode,
    IgnoredOwnWrite,
    ExcludedOwner,
    Unsupported,
    StorageFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Dropped(DropReason),
    Touched(EntryId),
    Inserted(EntryId),
}

/// Entries removed by one retention sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub by_count: usize,
    pub by_age: usize,
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct HistoryController<B: ClipboardBackend> {
    store: HistoryStore,
    observer: ClipboardObserver<B>,
    paste: PasteInjector,
    view: Box<dyn HistoryView>,
    settings: HistorySettings,
    ignore_next: Option<Instant>,
    ignore_timeout: Duration,
}

impl<B: ClipboardBackend> HistoryController<B> {
    pub fn new(
        store: HistoryStore,
        observer: ClipboardObserver<B>,
        paste: PasteInjector,
        view: Box<dyn HistoryView>,
        settings: HistorySettings,
    ) -> Self {
        Self {
            store,
            observer,
            paste,
            view,
            settings,
            ignore_next: None,
            ignore_timeout: IGNORE_NEXT_TIMEOUT,
        }
    }

    pub fn with_ignore_timeout(mut self, timeout: Duration) -> Self {
        self.ignore_timeout = timeout;
        self
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn observer_mut(&mut self) -> &mut ClipboardObserver<B> {
        &mut self.observer
    }

    pub fn view_mut(&mut self) -> &mut dyn HistoryView {
        self.view.as_mut()
    }

    pub fn settings(&self) -> &HistorySettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: HistorySettings) {
        self.settings = settings;
    }

    pub fn set_private_mode(&mut self, enabled: bool) {
        self.observer.set_private_mode(enabled);
    }

    pub fn is_ignoring_next(&self) -> bool {
        self.ignore_next.is_some()
    }

    /// Ingest one clipboard snapshot.
    pub fn on_snapshot(&mut self, snapshot: &Snapshot, owners: &OwnerNames) -> SnapshotOutcome {
        if self.observer.is_private() {
            debug!("Private mode, snapshot not stored");
            return SnapshotOutcome::Dropped(DropReason::PrivateMode);
        }

        if self.ignore_next.take().is_some() {
            debug!("Ignoring clipboard change caused by our own write");
            return SnapshotOutcome::Dropped(DropReason::IgnoredOwnWrite);
        }

        if let Some(app) = self.excluded_owner(owners) {
            debug!(app = %app, "Clipboard owner is excluded");
            return SnapshotOutcome::Dropped(DropReason::ExcludedOwner);
        }

        let Some(checksum) = fingerprint(snapshot) else {
            return SnapshotOutcome::Dropped(DropReason::Unsupported);
        };

        let now = now_ms();

        match self.store.find_by_checksum(checksum) {
            Ok(Some(existing)) => {
                return match self.store.touch_entry(existing, now) {
                    Ok(_) => {
                        debug!(id = existing, checksum, "Duplicate clipboard entry touched");
                        self.view.refresh();
                        SnapshotOutcome::Touched(existing)
                    }
                    Err(e) => {
                        error!(component = "controller", operation = "touch_entry", error = %e);
                        SnapshotOutcome::Dropped(DropReason::StorageFailure)
                    }
                };
            }
            Ok(None) => {}
            Err(e) => {
                error!(component = "controller", operation = "find_by_checksum", error = %e);
                return SnapshotOutcome::Dropped(DropReason::StorageFailure);
            }
        }

        let full_title = titles::full_title(snapshot).unwrap_or_default();
        let short_title = titles::short_title(&full_title, self.settings.lines_to_display);

        let id = match self
            .store
            .insert_entry(&full_title, &short_title, checksum, now)
        {
            Ok(id) => id,
            Err(e) => {
                error!(component = "controller", operation = "insert_entry", error = %e);
                return SnapshotOutcome::Dropped(DropReason::StorageFailure);
            }
        };

        let mut stored = 0;
        for (format, payload) in snapshot.allowed().iter() {
            if self.store.insert_blob(id, format, payload).log_err().is_some() {
                stored += 1;
            }
        }

        if stored == 0 {
            warn!(id, "No blobs stored for new entry, removing it");
            self.store.delete_entry(id).log_err();
            return SnapshotOutcome::Dropped(DropReason::StorageFailure);
        }

        info!(id, formats = stored, "Stored new clipboard entry");

        let report = self.sweep(now);
        if report != SweepReport::default() {
            debug!(
                by_count = report.by_count,
                by_age = report.by_age,
                "Retention sweep evicted entries"
            );
        }

        self.view.refresh();
        SnapshotOutcome::Inserted(id)
    }

    /// Put a stored entry back on the clipboard.
    ///
    /// Returns false when nothing was published (missing entry, private mode,
    /// clipboard error); the ignore-next guard is released in that case.
    pub fn apply(&mut self, entry_id: EntryId) -> bool {
        self.ignore_next = Some(Instant::now());

        let blobs = match self.store.get_blobs(entry_id) {
            Ok(blobs) if !blobs.is_empty() => blobs,
            Ok(_) => {
                warn!(id = entry_id, "Entry has no stored formats");
                self.ignore_next = None;
                return false;
            }
            Err(e) => {
                error!(component = "controller", operation = "get_blobs", error = %e);
                self.ignore_next = None;
                return false;
            }
        };

        let snapshot = Snapshot::from_pairs(blobs.into_iter().map(|b| (b.format, b.payload)));

        match self.observer.set_snapshot(&snapshot) {
            Ok(true) => {}
            Ok(false) => {
                self.ignore_next = None;
                return false;
            }
            Err(e) => {
                error!(component = "controller", operation = "set_snapshot", error = %e);
                self.ignore_next = None;
                return false;
            }
        }

        if self.settings.send_paste {
            self.paste.send_paste();
        }

        self.store.touch_entry(entry_id, now_ms()).log_err();
        self.view.refresh();
        true
    }

    /// Release the ignore-next guard if its change notification never came.
    pub fn expire_ignore_guard(&mut self) {
        if let Some(set_at) = self.ignore_next {
            if set_at.elapsed() >= self.ignore_timeout {
                debug!("Ignore-next guard expired without a clipboard change");
                self.ignore_next = None;
            }
        }
    }

    /// Delete an entry and its blobs on user request.
    pub fn delete(&mut self, entry_id: EntryId) -> bool {
        let removed = self.evict(entry_id);
        if removed {
            self.view.refresh();
        }
        removed
    }

    pub fn set_keep(&mut self, entry_id: EntryId, keep: bool) -> Result<bool> {
        let changed = self.store.set_keep(entry_id, keep)? > 0;
        if changed {
            self.view.refresh();
        }
        Ok(changed)
    }

    /// Enforce max-count and max-age retention. Kept entries are never evicted.
    pub fn sweep(&mut self, now: i64) -> SweepReport {
        let mut report = SweepReport::default();

        // Newest first
        let entries = match self.store.list_all_entries() {
            Ok(entries) => entries,
            Err(e) => {
                error!(component = "controller", operation = "sweep", error = %e);
                return report;
            }
        };

        let mut evicted = HashSet::new();
        let max_entries = self.settings.max_entries;
        // Kept entries don't count against the limit
        let mut remaining = entries.iter().filter(|e| !e.keep).count();

        if max_entries > 0 && remaining > max_entries {
            for entry in entries.iter().rev() {
                if remaining <= max_entries {
                    break;
                }
                if entry.keep {
                    continue;
                }
                if self.evict(entry.id) {
                    evicted.insert(entry.id);
                    remaining -= 1;
                    report.by_count += 1;
                }
            }
        }

        if self.settings.expire_days > 0 {
            let cutoff = now - i64::from(self.settings.expire_days) * MS_PER_DAY;
            for entry in entries.iter().rev() {
                if entry.keep || evicted.contains(&entry.id) {
                    continue;
                }
                if entry.created_at >= cutoff {
                    break;
                }
                if self.evict(entry.id) {
                    report.by_age += 1;
                }
            }
        }

        report
    }

    fn evict(&mut self, entry_id: EntryId) -> bool {
        self.store.delete_blobs(entry_id).log_err();
        match self.store.delete_entry(entry_id) {
            Ok(rows) => rows > 0,
            Err(e) => {
                error!(component = "controller", operation = "delete_entry", id = entry_id, error = %e);
                false
            }
        }
    }

    fn excluded_owner(&self, owners: &OwnerNames) -> Option<String> {
        owners.iter().find_map(|owner| {
            let owner = owner.to_lowercase();
            self.settings
                .excluded_apps
                .iter()
                .find(|app| owner.contains(app.as_str()))
                .cloned()
        })
    }

    /// Flush and compact the store, consuming the controller.
    pub fn close(self) -> Result<()> {
        self.store.vacuum_and_close()
    }
}
