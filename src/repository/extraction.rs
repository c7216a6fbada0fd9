//! Text-extraction repository for SQLite persistence.
//!
//! Append-only: each extraction attempt is a new row keyed by
//! `document_id`, so failed attempts remain visible in history instead of
//! being overwritten by a later retry.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use super::Result;
use crate::models::{Extraction, ExtractionStatus};

pub struct ExtractionRepository {
    db_path: PathBuf,
}

/// Per-source extraction rollup used by `show_stats`.
#[derive(Debug, Clone)]
pub struct ExtractionStats {
    pub source: String,
    pub status: String,
    pub count: i64,
    pub total_chars: i64,
    pub total_ocr_pages: i64,
}

impl ExtractionRepository {
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
            CREATE TABLE IF NOT EXISTS text_extractions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL,
                output_path TEXT,
                method TEXT,
                page_count INTEGER,
                char_count INTEGER,
                ocr_pages INTEGER DEFAULT 0,
                status TEXT DEFAULT 'pending',
                error TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                FOREIGN KEY (document_id) REFERENCES documents(id)
            );
            "#,
        )?;
        Ok(())
    }

    pub fn insert(&self, extraction: &Extraction) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO text_extractions
                (document_id, output_path, method, page_count, char_count, ocr_pages, status, error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                extraction.document_id,
                extraction.output_path,
                extraction.method,
                extraction.page_count,
                extraction.char_count.map(|v| v as i64),
                extraction.ocr_pages,
                extraction.status.as_str(),
                extraction.error,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Whether this document already has a completed extraction.
    pub fn has_completed(&self, document_id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM text_extractions WHERE document_id = ?1 AND status = 'completed')",
            params![document_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn get_stats(&self) -> Result<Vec<ExtractionStats>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT d.source, t.status, COUNT(*) as cnt,
                   COALESCE(SUM(t.char_count), 0) as total_chars,
                   COALESCE(SUM(t.ocr_pages), 0) as total_ocr_pages
            FROM text_extractions t
            JOIN documents d ON d.id = t.document_id
            GROUP BY d.source, t.status ORDER BY d.source
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ExtractionStats {
                    source: row.get(0)?,
                    status: row.get(1)?,
                    count: row.get(2)?,
                    total_chars: row.get(3)?,
                    total_ocr_pages: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DocumentRepository;
    use crate::models::Document;
    use tempfile::tempdir;

    #[test]
    fn test_insert_and_has_completed() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let doc_repo = DocumentRepository::new(&db_path).unwrap();
        let ext_repo = ExtractionRepository::new(&db_path).unwrap();

        let doc_id = doc_repo
            .insert(&Document::new("https://example.com/a.pdf".to_string(), "doj".to_string()))
            .unwrap();

        assert!(!ext_repo.has_completed(doc_id).unwrap());

        ext_repo
            .insert(&Extraction::completed(
                doc_id,
                "/data/extracted/a.txt".to_string(),
                "pdftotext".to_string(),
                3,
                512,
                0,
            ))
            .unwrap();

        assert!(ext_repo.has_completed(doc_id).unwrap());
    }

    #[test]
    fn test_failed_extraction_does_not_count_as_completed() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let doc_repo = DocumentRepository::new(&db_path).unwrap();
        let ext_repo = ExtractionRepository::new(&db_path).unwrap();

        let doc_id = doc_repo
            .insert(&Document::new("https://example.com/a.pdf".to_string(), "doj".to_string()))
            .unwrap();
        ext_repo
            .insert(&Extraction::failed(doc_id, "no text layer".to_string()))
            .unwrap();

        assert!(!ext_repo.has_completed(doc_id).unwrap());
        assert_eq!(ExtractionStatus::Failed.as_str(), "failed");
    }
}
