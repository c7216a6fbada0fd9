//! Text-extraction catalog entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of an extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Record of a single text-extraction run against a document.
///
/// The extraction table is append-only: a re-run inserts a new row
/// rather than updating the old one, so history of past failures is
/// preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub id: i64,
    pub document_id: i64,
    pub output_path: Option<String>,
    pub method: Option<String>,
    pub page_count: Option<u32>,
    pub char_count: Option<usize>,
    pub ocr_pages: u32,
    pub status: ExtractionStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Extraction {
    pub fn completed(
        document_id: i64,
        output_path: String,
        method: String,
        page_count: u32,
        char_count: usize,
        ocr_pages: u32,
    ) -> Self {
        Self {
            id: 0,
            document_id,
            output_path: Some(output_path),
            method: Some(method),
            page_count: Some(page_count),
            char_count: Some(char_count),
            ocr_pages,
            status: ExtractionStatus::Completed,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn failed(document_id: i64, error: String) -> Self {
        Self {
            id: 0,
            document_id,
            output_path: None,
            method: None,
            page_count: None,
            char_count: None,
            ocr_pages: 0,
            status: ExtractionStatus::Failed,
            error: Some(error),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_status_round_trip() {
        for status in [ExtractionStatus::Completed, ExtractionStatus::Failed] {
            assert_eq!(ExtractionStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_failed_extraction_has_no_output() {
        let ext = Extraction::failed(1, "pdftotext failed".to_string());
        assert_eq!(ext.status, ExtractionStatus::Failed);
        assert!(ext.output_path.is_none());
    }
}
