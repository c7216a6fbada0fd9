//! Document repository for SQLite persistence.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use super::{parse_datetime, to_option, Result};
use crate::models::{Document, DownloadStatus};

/// SQLite-backed document repository.
pub struct DocumentRepository {
    db_path: PathBuf,
}

/// Per-source, per-status rollup used by `show_stats`.
#[derive(Debug, Clone)]
pub struct DocumentStats {
    pub source: String,
    pub download_status: String,
    pub count: i64,
    pub total_bytes: i64,
}

impl DocumentRepository {
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
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                source TEXT NOT NULL,
                source_id TEXT DEFAULT '',
                filename TEXT DEFAULT '',
                title TEXT DEFAULT '',
                metadata TEXT DEFAULT '{}',
                local_path TEXT,
                sha256 TEXT,
                file_size INTEGER,
                download_status TEXT DEFAULT 'pending',
                error TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE(url)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source);
            CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(download_status);
            CREATE INDEX IF NOT EXISTS idx_documents_sha256 ON documents(sha256);
        "#,
        )?;
        Ok(())
    }

    fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
        let status_str: String = row.get("download_status")?;
        let metadata_str: String = row.get("metadata")?;
        Ok(Document {
            id: row.get("id")?,
            url: row.get("url")?,
            source: row.get("source")?,
            source_id: row.get("source_id")?,
            filename: row.get("filename")?,
            title: row.get("title")?,
            metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
            local_path: row.get("local_path")?,
            sha256: row.get("sha256")?,
            file_size: row.get::<_, Option<i64>>("file_size")?.map(|v| v as u64),
            download_status: DownloadStatus::from_str(&status_str).unwrap_or(DownloadStatus::Pending),
            error: row.get("error")?,
            created_at: parse_datetime(&row.get::<_, String>("created_at")?),
            updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
        })
    }

    /// Insert a document if its URL is not already catalogued, returning
    /// its row id either way. Idempotent: calling this twice for the same
    /// URL never creates a duplicate row.
    pub fn insert(&self, doc: &Document) -> Result<i64> {
        let conn = self.connect()?;
        let metadata = serde_json::to_string(&doc.metadata)?;

        conn.execute(
            r#"
            INSERT OR IGNORE INTO documents (url, source, source_id, filename, title, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![doc.url, doc.source, doc.source_id, doc.filename, doc.title, metadata],
        )?;

        conn.query_row(
            "SELECT id FROM documents WHERE url = ?1",
            params![doc.url],
            |row| row.get(0),
        )
        .map_err(Into::into)
    }

    /// Check whether a URL is already catalogued, regardless of status.
    pub fn url_exists(&self, url: &str) -> Result<bool> {
        let conn = self.connect()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE url = ?1)",
            params![url],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Return the local path of an already-downloaded document with the
    /// same content hash, if any. Only `downloaded` rows count toward
    /// content dedup.
    pub fn find_by_sha256(&self, sha256: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        to_option(conn.query_row(
            "SELECT local_path FROM documents WHERE sha256 = ?1 AND download_status = 'downloaded' LIMIT 1",
            params![sha256],
            |row| row.get(0),
        ))
    }

    pub fn get(&self, id: i64) -> Result<Option<Document>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
        to_option(stmt.query_row(params![id], Self::row_to_document))
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<Document>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE url = ?1")?;
        to_option(stmt.query_row(params![url], Self::row_to_document))
    }

    /// Record the outcome of a download attempt.
    pub fn update_download(
        &self,
        id: i64,
        status: DownloadStatus,
        local_path: Option<&str>,
        sha256: Option<&str>,
        file_size: Option<u64>,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE documents SET download_status = ?1, local_path = ?2, sha256 = ?3,
                file_size = ?4, error = ?5, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?6
            "#,
            params![
                status.as_str(),
                local_path,
                sha256,
                file_size.map(|v| v as i64),
                error,
                id
            ],
        )?;
        Ok(())
    }

    /// Documents downloaded but not yet successfully extracted.
    pub fn get_downloaded_without_extraction(&self, source: Option<&str>) -> Result<Vec<Document>> {
        let conn = self.connect()?;
        let sql = r#"
            SELECT d.* FROM documents d
            LEFT JOIN text_extractions t ON d.id = t.document_id AND t.status = 'completed'
            WHERE d.download_status = 'downloaded' AND t.id IS NULL
        "#;

        let rows = if let Some(source) = source {
            let mut stmt = conn.prepare(&format!("{sql} AND d.source = ?1"))?;
            stmt.query_map(params![source], Self::row_to_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = conn.prepare(sql)?;
            stmt.query_map([], Self::row_to_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };

        Ok(rows)
    }

    pub fn get_pending(&self, source: &str) -> Result<Vec<Document>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM documents WHERE source = ?1 AND download_status = 'pending'")?;
        let docs = stmt
            .query_map(params![source], Self::row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    /// Per-source, per-status counts and byte totals for `--stats`.
    pub fn get_stats(&self) -> Result<Vec<DocumentStats>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT source, download_status, COUNT(*) as cnt, COALESCE(SUM(file_size), 0) as total_bytes
            FROM documents GROUP BY source, download_status ORDER BY source, download_status
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DocumentStats {
                    source: row.get(0)?,
                    download_status: row.get(1)?,
                    count: row.get(2)?,
                    total_bytes: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo() -> (tempfile::TempDir, DocumentRepository) {
        let dir = tempdir().unwrap();
        let repo = DocumentRepository::new(&dir.path().join("catalog.db")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_insert_is_idempotent_on_url() {
        let (_dir, repo) = repo();
        let doc = Document::new("https://example.com/a.pdf".to_string(), "doj".to_string());
        let id1 = repo.insert(&doc).unwrap();
        let id2 = repo.insert(&doc).unwrap();
        assert_eq!(id1, id2);
        assert!(repo.url_exists(&doc.url).unwrap());
    }

    #[test]
    fn test_update_download_sets_status() {
        let (_dir, repo) = repo();
        let doc = Document::new("https://example.com/a.pdf".to_string(), "doj".to_string());
        let id = repo.insert(&doc).unwrap();

        repo.update_download(
            id,
            DownloadStatus::Downloaded,
            Some("/data/documents/ab/abcdef12.pdf"),
            Some("abcdef1234567890"),
            Some(1024),
            None,
        )
        .unwrap();

        let fetched = repo.get(id).unwrap().unwrap();
        assert_eq!(fetched.download_status, DownloadStatus::Downloaded);
        assert_eq!(fetched.sha256.as_deref(), Some("abcdef1234567890"));
    }

    #[test]
    fn test_content_dedup_excludes_non_downloaded() {
        let (_dir, repo) = repo();
        let doc = Document::new("https://example.com/a.pdf".to_string(), "doj".to_string());
        let id = repo.insert(&doc).unwrap();
        repo.update_download(id, DownloadStatus::Failed, None, Some("deadbeef"), None, Some("timeout"))
            .unwrap();

        assert_eq!(repo.find_by_sha256("deadbeef").unwrap(), None);
    }

    #[test]
    fn test_get_pending_filters_by_source_and_status() {
        let (_dir, repo) = repo();
        let a = Document::new("https://example.com/a.pdf".to_string(), "doj".to_string());
        let b = Document::new("https://example.com/b.pdf".to_string(), "fbi_vault".to_string());
        let id_a = repo.insert(&a).unwrap();
        repo.insert(&b).unwrap();
        repo.update_download(id_a, DownloadStatus::Downloaded, Some("/x"), Some("h"), Some(1), None)
            .unwrap();

        let pending = repo.get_pending("doj").unwrap();
        assert!(pending.is_empty());
        let pending_fbi = repo.get_pending("fbi_vault").unwrap();
        assert_eq!(pending_fbi.len(), 1);
    }
}
