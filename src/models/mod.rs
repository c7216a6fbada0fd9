//! Data models for the document catalog.

mod document;
mod extraction;

pub use document::{Document, DownloadStatus};
pub use extraction::{Extraction, ExtractionStatus};
