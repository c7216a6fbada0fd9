//! Document catalog entry.
//!
//! Unlike a versioned content store, a `Document` here is a single flat
//! row keyed by `url`: the catalog tracks the latest known state of a
//! URL, not a history of every version ever seen at it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a document's download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Downloaded,
    Failed,
    Skipped,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloaded => "downloaded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "downloaded" => Some(Self::Downloaded),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// A single catalogued document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Database row ID. Zero until inserted.
    pub id: i64,
    /// Canonical source URL. Unique across the catalog.
    pub url: String,
    /// Name of the adapter that discovered this document.
    pub source: String,
    /// Source-specific identifier (docket id, collection id, slug, ...).
    pub source_id: String,
    pub filename: String,
    pub title: String,
    /// Arbitrary adapter-supplied metadata (query that found it, role, etc).
    pub metadata: serde_json::Value,
    pub local_path: Option<String>,
    pub sha256: Option<String>,
    pub file_size: Option<u64>,
    pub download_status: DownloadStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Construct a new, not-yet-downloaded document ready for insertion.
    pub fn new(url: String, source: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            url,
            source,
            source_id: String::new(),
            filename: String::new(),
            title: String::new(),
            metadata: serde_json::json!({}),
            local_path: None,
            sha256: None,
            file_size: None,
            download_status: DownloadStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_is_pending() {
        let doc = Document::new("https://example.com/a.pdf".to_string(), "doj".to_string());
        assert_eq!(doc.download_status, DownloadStatus::Pending);
        assert!(doc.local_path.is_none());
    }

    #[test]
    fn test_download_status_round_trip() {
        for status in [
            DownloadStatus::Pending,
            DownloadStatus::Downloaded,
            DownloadStatus::Failed,
            DownloadStatus::Skipped,
        ] {
            assert_eq!(DownloadStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_download_status_unknown() {
        assert_eq!(DownloadStatus::from_str("bogus"), None);
    }
}
