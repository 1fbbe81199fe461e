//! Append-only transcription history backed by SQLite.
//!
//! The store owns a single connection behind a mutex; SQLite itself
//! serializes writes, so no further application-level locking is layered on
//! top. Records are immutable once inserted: the store only inserts and
//! bulk-deletes.

use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Display-oriented cap on history queries.
pub const HISTORY_LIMIT: usize = 20;

/// One stored transcription.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionRecord {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Errors raised by the history store.
#[derive(Debug)]
pub enum HistoryError {
    Io(std::io::Error),
    Sqlite(rusqlite::Error),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::Io(e) => write!(f, "History store I/O error: {}", e),
            HistoryError::Sqlite(e) => write!(f, "History store error: {}", e),
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<rusqlite::Error> for HistoryError {
    fn from(e: rusqlite::Error) -> Self {
        HistoryError::Sqlite(e)
    }
}

/// SQLite-backed transcription log. Cheap to clone; clones share the
/// underlying connection.
#[derive(Clone)]
pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    /// Open (creating if needed) the store at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(HistoryError::Io)?;
        }
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS transcriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert one record; the store assigns id and timestamp.
    pub fn add(&self, text: &str) -> Result<(), HistoryError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO transcriptions (text) VALUES (?1)",
            params![text],
        )?;
        Ok(())
    }

    /// Up to `limit` newest records, newest first. Older records stay stored;
    /// the limit only bounds what this query returns.
    pub fn list(&self, limit: usize) -> Result<Vec<TranscriptionRecord>, HistoryError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "
            SELECT id, text, timestamp
            FROM transcriptions
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1
            ",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Delete all records unconditionally.
    pub fn clear(&self) -> Result<(), HistoryError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM transcriptions", [])?;
        Ok(())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TranscriptionRecord> {
    let raw_ts: String = row.get(2)?;
    Ok(TranscriptionRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: parse_timestamp(&raw_ts)?,
    })
}

/// SQLite's CURRENT_TIMESTAMP produces `YYYY-MM-DD HH:MM:SS` in UTC.
fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })
}
