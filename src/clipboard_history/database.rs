//! Clipboard history database operations
//!
//! SQLite storage for entries and their per-format blobs: schema creation,
//! additive migrations, and the CRUD operations the controller builds on.
//! The store is owned by the core thread; every write is a single statement
//! and therefore its own implicit transaction.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::types::{Blob, BlobId, Entry, EntryId};
use crate::checksum::Fingerprint;
use crate::error::{ClipkeeperError, Result};

/// File name of the history database inside the data directory
pub const DB_FILE_NAME: &str = "contents.db";

/// Per-user data directory (~/.local/share/clipkeeper on Linux,
/// %LOCALAPPDATA%\clipkeeper on Windows)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("clipkeeper"))
        .or_else(|| dirs::home_dir().map(|h| h.join(".clipkeeper")))
        .unwrap_or_else(|| std::env::temp_dir().join("clipkeeper"))
}

/// Get the database path inside `data_dir`, creating the directory if needed.
pub fn get_db_path(data_dir: &Path) -> Result<PathBuf> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir).map_err(|source| ClipkeeperError::DataDir {
            path: data_dir.to_path_buf(),
            source,
        })?;
    }
    Ok(data_dir.join(DB_FILE_NAME))
}

const ENTRY_COLUMNS: &str = "id, full_title, short_title, checksum, created_at, keep";

/// Entries without blobs are never surfaced
const HAS_BLOBS: &str = "EXISTS (SELECT 1 FROM blobs b WHERE b.parent_id = entries.id)";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        full_title: row.get(1)?,
        short_title: row.get(2)?,
        checksum: row.get::<_, i64>(3)? as Fingerprint,
        created_at: row.get(4)?,
        keep: row.get::<_, i64>(5)? != 0,
    })
}

pub struct HistoryStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// Open or create the history database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(ClipkeeperError::storage("open"))?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        info!(path = %path.display(), "Opened clipboard history database");
        Ok(store)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(ClipkeeperError::storage("open"))?;
        let store = Self { conn, path: None };
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn initialize(&self) -> Result<()> {
        // Incremental vacuum must be chosen before the first table exists
        self.conn
            .execute_batch(
                "PRAGMA auto_vacuum = INCREMENTAL;
                 PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
            .map_err(ClipkeeperError::storage("configure"))?;
        debug!("Configured clipboard history pragmas");

        create_schema(&self.conn)?;
        run_migrations(&self.conn)?;
        create_indexes(&self.conn)?;
        Ok(())
    }

    pub fn insert_entry(
        &self,
        full_title: &str,
        short_title: &str,
        checksum: Fingerprint,
        created_at: i64,
    ) -> Result<EntryId> {
        self.conn
            .execute(
                "INSERT INTO entries (full_title, short_title, checksum, created_at, keep)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![full_title, short_title, checksum as i64, created_at],
            )
            .map_err(ClipkeeperError::storage("insert_entry"))?;
        let id = self.conn.last_insert_rowid();
        debug!(id, checksum, "Inserted clipboard entry");
        Ok(id)
    }

    pub fn insert_blob(&self, entry_id: EntryId, format: &str, payload: &[u8]) -> Result<BlobId> {
        self.conn
            .execute(
                "INSERT INTO blobs (parent_id, format, payload) VALUES (?1, ?2, ?3)",
                params![entry_id, format, payload],
            )
            .map_err(ClipkeeperError::storage("insert_blob"))?;
        let id = self.conn.last_insert_rowid();
        debug!(id, entry_id, format, bytes = payload.len(), "Inserted blob");
        Ok(id)
    }

    /// Update only the timestamp of an entry.
    pub fn touch_entry(&self, entry_id: EntryId, created_at: i64) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE entries SET created_at = ?1 WHERE id = ?2",
                params![created_at, entry_id],
            )
            .map_err(ClipkeeperError::storage("touch_entry"))
    }

    pub fn delete_entry(&self, entry_id: EntryId) -> Result<usize> {
        self.conn
            .execute("DELETE FROM entries WHERE id = ?1", params![entry_id])
            .map_err(ClipkeeperError::storage("delete_entry"))
    }

    pub fn delete_blobs(&self, entry_id: EntryId) -> Result<usize> {
        self.conn
            .execute("DELETE FROM blobs WHERE parent_id = ?1", params![entry_id])
            .map_err(ClipkeeperError::storage("delete_blobs"))
    }

    /// All blobs of an entry in insertion order.
    pub fn get_blobs(&self, entry_id: EntryId) -> Result<Vec<Blob>> {
        let mut stmt = self
            .conn
            .prepare("SELECT format, payload FROM blobs WHERE parent_id = ?1 ORDER BY id")
            .map_err(ClipkeeperError::storage("get_blobs"))?;

        let blobs = stmt
            .query_map(params![entry_id], |row| {
                Ok(Blob {
                    format: row.get(0)?,
                    payload: row.get(1)?,
                })
            })
            .map_err(ClipkeeperError::storage("get_blobs"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(ClipkeeperError::storage("get_blobs"))?;

        Ok(blobs)
    }

    /// Every entry that has at least one blob, newest first, fully materialized.
    pub fn list_entries(&self) -> Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries WHERE {} ORDER BY created_at DESC, id DESC",
            ENTRY_COLUMNS, HAS_BLOBS
        );
        self.query_entries(&sql, "list_entries")
    }

    /// Every entry including blobless ones, newest first. Retention walks this
    /// so orphans left by a failed blob insert still get evicted.
    pub fn list_all_entries(&self) -> Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries ORDER BY created_at DESC, id DESC",
            ENTRY_COLUMNS
        );
        self.query_entries(&sql, "list_all_entries")
    }

    fn query_entries(&self, sql: &str, operation: &'static str) -> Result<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(ClipkeeperError::storage(operation))?;

        let entries = stmt
            .query_map([], entry_from_row)
            .map_err(ClipkeeperError::storage(operation))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(ClipkeeperError::storage(operation))?;

        Ok(entries)
    }

    pub fn entry(&self, entry_id: EntryId) -> Result<Option<Entry>> {
        let sql = format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS);
        self.conn
            .query_row(&sql, params![entry_id], entry_from_row)
            .optional()
            .map_err(ClipkeeperError::storage("entry"))
    }

    /// Most recent listed entry carrying this checksum, if any.
    pub fn find_by_checksum(&self, checksum: Fingerprint) -> Result<Option<EntryId>> {
        let sql = format!(
            "SELECT id FROM entries WHERE checksum = ?1 AND {}
             ORDER BY created_at DESC, id DESC LIMIT 1",
            HAS_BLOBS
        );
        self.conn
            .query_row(
                &sql,
                params![checksum as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(ClipkeeperError::storage("find_by_checksum"))
    }

    pub fn count_entries(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get::<_, i64>(0))
            .map(|count| count as usize)
            .map_err(ClipkeeperError::storage("count_entries"))
    }

    /// Case-insensitive substring search over full titles, newest first.
    pub fn search(&self, query: &str) -> Result<Vec<Entry>> {
        let needle = query.to_lowercase();
        let mut entries = self.list_entries()?;
        if !needle.is_empty() {
            entries.retain(|entry| entry.full_title.to_lowercase().contains(&needle));
        }
        Ok(entries)
    }

    pub fn set_keep(&self, entry_id: EntryId, keep: bool) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE entries SET keep = ?1 WHERE id = ?2",
                params![keep as i64, entry_id],
            )
            .map_err(ClipkeeperError::storage("set_keep"))
    }

    /// Flush the WAL into the main database file.
    pub fn checkpoint(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(ClipkeeperError::storage("checkpoint"))?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Compact the database file and close the connection.
    pub fn vacuum_and_close(self) -> Result<()> {
        self.checkpoint()?;
        self.conn
            .execute_batch("VACUUM;")
            .map_err(ClipkeeperError::storage("vacuum"))?;
        self.conn
            .close()
            .map_err(|(_, source)| ClipkeeperError::Storage {
                operation: "close",
                source,
            })?;
        info!("Clipboard history database closed");
        Ok(())
    }
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_title TEXT NOT NULL,
            short_title TEXT NOT NULL,
            checksum INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(ClipkeeperError::storage("create entries table"))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS blobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER NOT NULL,
            format TEXT NOT NULL,
            payload BLOB NOT NULL
        )",
        [],
    )
    .map_err(ClipkeeperError::storage("create blobs table"))?;

    Ok(())
}

/// Add a column if it doesn't exist yet. Returns true if it was added.
fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<bool> {
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            params![table, column],
            |row| row.get::<_, i32>(0),
        )
        .map(|count| count > 0)
        .map_err(ClipkeeperError::storage("inspect schema"))?;

    if exists {
        return Ok(false);
    }

    conn.execute(
        &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition),
        [],
    )
    .map_err(ClipkeeperError::storage("add column"))?;
    Ok(true)
}

fn run_migrations(conn: &Connection) -> Result<()> {
    // Migration: never-delete flag
    if add_column_if_missing(conn, "entries", "keep", "INTEGER NOT NULL DEFAULT 0")? {
        info!("Migrated clipboard history: added keep column");
    }
    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at DESC);
         CREATE INDEX IF NOT EXISTS idx_entries_checksum ON entries(checksum);
         CREATE INDEX IF NOT EXISTS idx_blobs_parent ON blobs(parent_id);",
    )
    .map_err(ClipkeeperError::storage("create indexes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn has_column(store: &HistoryStore, column: &str) -> bool {
        store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('entries') WHERE name = ?1",
                params![column],
                |row| row.get::<_, i32>(0),
            )
            .map(|count| count > 0)
            .unwrap()
    }

    #[test]
    fn test_db_path_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested").join("clipkeeper");
        let path = get_db_path(&data_dir).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(path, data_dir.join(DB_FILE_NAME));
    }

    #[test]
    fn test_open_twice_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DB_FILE_NAME);

        let store = HistoryStore::open(&path).unwrap();
        let id = store.insert_entry("a", "a", 1, 100).unwrap();
        drop(store);

        let store = HistoryStore::open(&path).unwrap();
        assert!(has_column(&store, "keep"));
        assert_eq!(store.entry(id).unwrap().map(|e| e.full_title), Some("a".into()));
    }

    #[test]
    fn test_migrates_legacy_schema_without_keep() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DB_FILE_NAME);
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    full_title TEXT NOT NULL,
                    short_title TEXT NOT NULL,
                    checksum INTEGER NOT NULL,
                    created_at INTEGER NOT NULL
                );
                INSERT INTO entries (full_title, short_title, checksum, created_at)
                VALUES ('old', 'old', 7, 5);",
            )
            .unwrap();
        }

        let store = HistoryStore::open(&path).unwrap();
        assert!(has_column(&store, "keep"));
        let entries = store.list_all_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].keep);
    }

    #[test]
    fn test_insert_and_get_blobs() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.insert_entry("hello", "hello", 42, 1_000).unwrap();
        store.insert_blob(id, "text/plain", b"hello").unwrap();
        store.insert_blob(id, "text/html", b"<p>hello</p>").unwrap();

        let blobs = store.get_blobs(id).unwrap();
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].format, "text/plain");
        assert_eq!(blobs[0].payload, b"hello");
        assert_eq!(blobs[1].format, "text/html");
    }

    #[test]
    fn test_list_entries_newest_first() {
        let store = HistoryStore::open_in_memory().unwrap();
        let old = store.insert_entry("old", "old", 1, 1_000).unwrap();
        store.insert_blob(old, "text/plain", b"old").unwrap();
        let new = store.insert_entry("new", "new", 2, 2_000).unwrap();
        store.insert_blob(new, "text/plain", b"new").unwrap();

        let ids: Vec<EntryId> = store.list_entries().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![new, old]);

        store.touch_entry(old, 3_000).unwrap();
        let ids: Vec<EntryId> = store.list_entries().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![old, new]);
    }

    #[test]
    fn test_delete_entry_and_blobs() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.insert_entry("x", "x", 9, 1).unwrap();
        store.insert_blob(id, "text/plain", b"x").unwrap();

        assert_eq!(store.delete_blobs(id).unwrap(), 1);
        assert_eq!(store.delete_entry(id).unwrap(), 1);
        assert_eq!(store.count_entries().unwrap(), 0);
        assert!(store.get_blobs(id).unwrap().is_empty());

        // Deleting again affects nothing
        assert_eq!(store.delete_entry(id).unwrap(), 0);
    }

    #[test]
    fn test_checksum_round_trips_full_u32_range() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.insert_entry("max", "max", u32::MAX, 1).unwrap();
        store.insert_blob(id, "text/plain", b"max").unwrap();
        assert_eq!(store.entry(id).unwrap().unwrap().checksum, u32::MAX);
        assert_eq!(store.find_by_checksum(u32::MAX).unwrap(), Some(id));
        assert_eq!(store.find_by_checksum(12345).unwrap(), None);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let store = HistoryStore::open_in_memory().unwrap();
        let hello = store.insert_entry("Hello World", "Hello World", 1, 1).unwrap();
        store.insert_blob(hello, "text/plain", b"Hello World").unwrap();
        let bye = store.insert_entry("goodbye", "goodbye", 2, 2).unwrap();
        store.insert_blob(bye, "text/plain", b"goodbye").unwrap();

        let hits = store.search("WORLD").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_title, "Hello World");
        assert_eq!(store.search("").unwrap().len(), 2);
    }

    #[test]
    fn test_blobless_entries_are_not_surfaced() {
        let store = HistoryStore::open_in_memory().unwrap();
        let listed = store.insert_entry("listed", "listed", 1, 1).unwrap();
        store.insert_blob(listed, "text/plain", b"listed").unwrap();
        let orphan = store.insert_entry("orphan", "orphan", 2, 2).unwrap();

        let ids: Vec<EntryId> = store.list_entries().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![listed]);
        assert!(store.search("orphan").unwrap().is_empty());
        assert_eq!(store.find_by_checksum(2).unwrap(), None);

        // Still visible to retention
        assert_eq!(store.list_all_entries().unwrap().len(), 2);
        assert!(store.entry(orphan).unwrap().is_some());
    }

    #[test]
    fn test_set_keep() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.insert_entry("k", "k", 1, 1).unwrap();
        store.set_keep(id, true).unwrap();
        assert!(store.entry(id).unwrap().unwrap().keep);
        store.set_keep(id, false).unwrap();
        assert!(!store.entry(id).unwrap().unwrap().keep);
    }

    #[test]
    fn test_vacuum_and_close() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DB_FILE_NAME);
        let store = HistoryStore::open(&path).unwrap();
        let id = store.insert_entry("v", "v", 1, 1).unwrap();
        store.insert_blob(id, "text/plain", b"v").unwrap();
        store.vacuum_and_close().unwrap();

        let store = HistoryStore::open(&path).unwrap();
        assert_eq!(store.count_entries().unwrap(), 1);
    }
}
