//! SQLite reference backend for the entry store (§6 store wire-contract).
//!
//! Grouping key for the uniques view: SHA-1 if enabled, else SHA-256, else
//! MD5 (§4.3, §9 — this implementation's explicit resolution of the
//! distilled spec's grouping-key open question). The selection is fixed at
//! construction time from the run's digest selection and baked into the
//! `get_unique_elements_all` view.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::digest::DigestSelection;
use crate::error::StoreError;
use crate::model::Entry;
use crate::store::EntryStore;

const INSERT_ELEMENT: &str =
    "INSERT INTO elements(sha1, sha256, md5, deviceid, path, fileslack) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const QUERY_UNIQUE_ELEMENTS: &str =
    "SELECT path FROM get_unique_elements_all WHERE deviceid = ?1 ORDER BY path ASC";

struct Inner {
    conn: Connection,
    pending: u64,
}

pub struct SqliteEntryStore {
    db_path: PathBuf,
    grouping_column: &'static str,
    write_threshold: u64,
    inner: Mutex<Option<Inner>>,
}

impl SqliteEntryStore {
    pub fn new(db_path: impl AsRef<Path>, selection: DigestSelection, write_threshold: u64) -> Self {
        let grouping_column = if selection.sha1 {
            "sha1"
        } else if selection.sha256 {
            "sha256"
        } else {
            "md5"
        };
        SqliteEntryStore {
            db_path: db_path.as_ref().to_path_buf(),
            grouping_column,
            write_threshold: if write_threshold == 0 { 1000 } else { write_threshold },
            inner: Mutex::new(None),
        }
    }

    fn schema_script(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS elements (\n\
                sha1 TEXT, sha256 TEXT, md5 TEXT,\n\
                deviceid INTEGER NOT NULL, path TEXT NOT NULL, fileslack BLOB\n\
             );\n\
             CREATE UNIQUE INDEX IF NOT EXISTS elements_identity ON elements(deviceid, path, sha1, sha256, md5);\n\
             CREATE VIEW IF NOT EXISTS get_unique_elements_all AS\n\
                SELECT deviceid, MIN(path) AS path\n\
                FROM elements\n\
                GROUP BY deviceid, {};",
            self.grouping_column
        )
    }
}

impl EntryStore for SqliteEntryStore {
    fn open(&self) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if guard.is_some() {
            return Ok(());
        }
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(&self.schema_script())?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        *guard = Some(Inner { conn, pending: 0 });
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        let inner = guard.take().ok_or(StoreError::NotOpen)?;
        inner.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn abort(&self) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        let inner = guard.take().ok_or(StoreError::NotOpen)?;
        inner.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn store_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        let inner = guard.as_mut().ok_or(StoreError::NotOpen)?;

        let result = inner.conn.execute(
            INSERT_ELEMENT,
            params![
                entry.sha1,
                entry.sha256,
                entry.md5,
                entry.device_id,
                entry.file_path,
                entry.file_slack,
            ],
        );

        match result {
            Ok(_) => {
                inner.pending += 1;
                if inner.pending >= self.write_threshold {
                    inner.conn.execute_batch("COMMIT; BEGIN TRANSACTION")?;
                    inner.pending = 0;
                }
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                log::error!(
                    "duplicate entry for device {} path {}: already recorded",
                    entry.device_id,
                    entry.file_path
                );
                Ok(())
            }
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    fn get_uniques_for_device(&self, device_id: u32, chunk_size: i64) -> Result<Vec<String>, StoreError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        let inner = guard.as_mut().ok_or(StoreError::NotOpen)?;

        // Commit any pending writes so the view sees a consistent snapshot.
        let _ = inner.conn.execute_batch("COMMIT; BEGIN TRANSACTION");

        let mut stmt = inner.conn.prepare(QUERY_UNIQUE_ELEMENTS)?;
        let mut rows = stmt.query(params![device_id])?;

        let batch_size = if chunk_size <= 0 { usize::MAX } else { chunk_size as usize };
        let mut out = Vec::new();
        loop {
            let mut took = 0usize;
            while took < batch_size {
                match rows.next()? {
                    Some(row) => {
                        let path: String = row.get(0)?;
                        out.push(path);
                        took += 1;
                    }
                    None => return Ok(out),
                }
            }
        }
    }
}
