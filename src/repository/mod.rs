//! Repository layer for catalog persistence.
//!
//! A single SQLite file backs the whole catalog. Each repository owns its
//! own table and creates it on construction; there is no separate
//! migration-runner, since the schema is small and additive.

#![allow(dead_code)]

mod document;
mod extraction;
mod source_state;

pub use document::DocumentRepository;
pub use extraction::ExtractionRepository;
pub use source_state::SourceStateRepository;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Convert a rusqlite Result<T> to Result<Option<T>>, treating QueryReturnedNoRows as None.
pub fn to_option<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Create a database connection with settings tuned for a single-writer,
/// many-reader workload.
pub fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;

    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 30000;

        PRAGMA cache_size = -64000;        -- 64MB cache (negative = KB)
        PRAGMA mmap_size = 268435456;      -- 256MB memory-mapped I/O
        PRAGMA temp_store = MEMORY;        -- Store temp tables in memory
        PRAGMA page_size = 4096;
    "#,
    )?;

    Ok(conn)
}

/// Execute a database operation with retry logic for lock errors.
/// Retries up to 5 times with exponential backoff (100ms, 200ms, 400ms, 800ms, 1600ms).
pub fn with_retry<T, F>(mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_retries = 5;
    let mut delay_ms = 100;

    for attempt in 0..max_retries {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e @ RepositoryError::Database(_)) => {
                let msg = e.to_string();
                let is_lock_error = msg.contains("database is locked")
                    || msg.contains("SQLITE_BUSY")
                    || msg.contains("SQLITE_LOCKED");

                if is_lock_error && attempt < max_retries - 1 {
                    tracing::debug!(
                        "database locked, retrying in {}ms (attempt {}/{})",
                        delay_ms,
                        attempt + 1,
                        max_retries
                    );
                    thread::sleep(Duration::from_millis(delay_ms));
                    delay_ms *= 2;
                    continue;
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        }
    }

    operation()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_connect_sets_wal_mode() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let conn = connect(&db_path).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_to_option_no_rows() {
        let result: rusqlite::Result<i64> = Err(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(to_option(result).unwrap(), None);
    }

    #[test]
    fn test_with_retry_succeeds_first_try() {
        let result = with_retry(|| Ok::<_, RepositoryError>(42));
        assert_eq!(result.unwrap(), 42);
    }
}
