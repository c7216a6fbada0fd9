//! Per-source crawl checkpoint repository.
//!
//! Each adapter persists an opaque JSON blob describing where it left
//! off (page cursors, completed slugs, ...), keyed by source name, so a
//! restarted run resumes rather than re-discovering from scratch.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use super::{to_option, Result};

pub struct SourceStateRepository {
    db_path: PathBuf,
}

impl SourceStateRepository {
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS source_state (
                source TEXT PRIMARY KEY,
                state TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn save(&self, source: &str, state: &serde_json::Value) -> Result<()> {
        let conn = self.connect()?;
        let state_json = serde_json::to_string(state)?;
        conn.execute(
            r#"
            INSERT INTO source_state (source, state, updated_at)
            VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            ON CONFLICT(source) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
            params![source, state_json],
        )?;
        Ok(())
    }

    pub fn get(&self, source: &str) -> Result<serde_json::Value> {
        let conn = self.connect()?;
        let state: Option<String> = to_option(conn.query_row(
            "SELECT state FROM source_state WHERE source = ?1",
            params![source],
            |row| row.get(0),
        ))?;

        match state {
            Some(s) => Ok(serde_json::from_str(&s)?),
            None => Ok(serde_json::json!({})),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_get_round_trip() {
        let dir = tempdir().unwrap();
        let repo = SourceStateRepository::new(&dir.path().join("catalog.db")).unwrap();

        let state = serde_json::json!({"ds1_page": 4, "completed": ["alice", "bob"]});
        repo.save("epsteingraph", &state).unwrap();

        assert_eq!(repo.get("epsteingraph").unwrap(), state);
    }

    #[test]
    fn test_get_unknown_source_returns_empty_object() {
        let dir = tempdir().unwrap();
        let repo = SourceStateRepository::new(&dir.path().join("catalog.db")).unwrap();
        assert_eq!(repo.get("never_run").unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_save_overwrites_existing_state() {
        let dir = tempdir().unwrap();
        let repo = SourceStateRepository::new(&dir.path().join("catalog.db")).unwrap();

        repo.save("doj", &serde_json::json!({"ds1_page": 1})).unwrap();
        repo.save("doj", &serde_json::json!({"ds1_page": 2})).unwrap();

        assert_eq!(repo.get("doj").unwrap(), serde_json::json!({"ds1_page": 2}));
    }
}
