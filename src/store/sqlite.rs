//! SQLite-backed record store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use super::schema::{apply_schema, read_schema_version};
use super::types::{ListOrder, Record, now_iso8601};
use super::RecordStore;
use crate::error::{PollError, Result};

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`RecordStore`].
///
/// Thread-safe via an internal `Mutex`. The connection is opened lazily by
/// [`initialize`](RecordStore::initialize). Before `initialize` is first
/// called every operation fails with [`PollError::StorageUnavailable`]. If
/// that first open failed, each later operation tries to open again, so a
/// medium that becomes available later is picked up.
pub struct SqliteRecordStore {
    /// `None` means an in-memory database.
    path: Option<PathBuf>,
    conn: Mutex<Option<Connection>>,
    init_requested: AtomicBool,
}

impl SqliteRecordStore {
    /// Create a store for `path` without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            conn: Mutex::new(None),
            init_requested: AtomicBool::new(false),
        }
    }

    /// Create and initialize a store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    /// Create and initialize a private in-memory store.
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            path: None,
            conn: Mutex::new(None),
            init_requested: AtomicBool::new(false),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Database file path, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the schema version stamped on first initialize.
    pub fn schema_version(&self) -> Result<Option<u32>> {
        self.with_conn(|conn| Ok(read_schema_version(conn)?))
    }

    fn open_connection(&self) -> Result<Connection> {
        let conn = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        PollError::StorageUnavailable(format!(
                            "cannot create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
                Connection::open(path)?
            }
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        apply_schema(&conn)?;
        Ok(conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|e| PollError::StorageUnavailable(format!("connection lock poisoned: {e}")))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        if guard.is_none() && self.init_requested.load(Ordering::SeqCst) {
            let conn = self.open_connection()?;
            info!("record store opened after an earlier failure");
            *guard = Some(conn);
        }
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(PollError::StorageUnavailable(
                "record store is not initialized".into(),
            )),
        }
    }
}

impl RecordStore for SqliteRecordStore {
    fn initialize(&self) -> Result<()> {
        self.init_requested.store(true, Ordering::SeqCst);
        let mut guard = self.lock()?;
        if let Some(conn) = guard.as_ref() {
            apply_schema(conn)?;
            debug!("record store schema re-applied");
            return Ok(());
        }

        let conn = self.open_connection()?;
        match &self.path {
            Some(path) => info!(path = %path.display(), "record store initialized"),
            None => info!("in-memory record store initialized"),
        }
        *guard = Some(conn);
        Ok(())
    }

    fn append(&self, primary_label: &str, secondary_label: &str) -> Result<Record> {
        self.with_conn(|conn| {
            let observed_at = now_iso8601();
            conn.execute(
                "INSERT INTO records (primary_label, secondary_label, observed_at) \
                 VALUES (?1, ?2, ?3)",
                params![primary_label, secondary_label, observed_at],
            )?;
            Ok(Record {
                id: conn.last_insert_rowid(),
                primary_label: primary_label.to_owned(),
                secondary_label: secondary_label.to_owned(),
                observed_at,
            })
        })
    }

    fn latest(&self) -> Result<Option<Record>> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT id, primary_label, secondary_label, observed_at \
                     FROM records ORDER BY id DESC LIMIT 1",
                    [],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
    }

    fn list_all(&self, order: ListOrder) -> Result<Vec<Record>> {
        self.with_conn(|conn| {
            let sql = match order {
                ListOrder::Ascending => {
                    "SELECT id, primary_label, secondary_label, observed_at \
                     FROM records ORDER BY id ASC"
                }
                ListOrder::Descending => {
                    "SELECT id, primary_label, secondary_label, observed_at \
                     FROM records ORDER BY id DESC"
                }
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map([], row_to_record)?;

            let mut records = Vec::new();
            for r in rows {
                records.push(r?);
            }
            Ok(records)
        })
    }

    fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or_default())
        })
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        primary_label: row.get(1)?,
        secondary_label: row.get(2)?,
        observed_at: row.get(3)?,
    })
}
