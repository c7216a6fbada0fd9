//! Orchestration: wires the shared Fetcher/Extractor/Catalog together,
//! runs one or all adapters sequentially, drives extraction-only mode,
//! and prints aggregated stats. No CLI parsing here — see `cli`.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::adapters::{self, Adapter, AdapterContext};
use crate::config::Config;
use crate::extract::{self, TextExtractor};
use crate::fetch::HttpFetcher;
use crate::repository::{DocumentRepository, ExtractionRepository, RepositoryError, SourceStateRepository};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("catalog error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown source: {0}")]
    UnknownSource(String),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Shared state every orchestrator run draws on. Constructing one opens
/// the catalog and builds the data/log directories; a failure here is
/// fatal, matching spec.md §7's "orchestrator-level failures are fatal".
pub struct Orchestrator {
    ctx: AdapterContext,
}

impl Orchestrator {
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(&config.log_dir)?;
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let documents = Arc::new(DocumentRepository::new(&config.db_path)?);
        let extractions = Arc::new(ExtractionRepository::new(&config.db_path)?);
        let source_state = Arc::new(SourceStateRepository::new(&config.db_path)?);

        let extractor = Arc::new(
            TextExtractor::new()
                .with_min_chars(config.extraction.min_chars_per_page)
                .with_dpi(config.extraction.ocr_dpi)
                .with_language(&config.extraction.tesseract_lang)
                .with_max_ocr_pages(config.extraction.max_ocr_pages),
        );

        let fetcher = HttpFetcher::new(
            &config.download.user_agent,
            std::time::Duration::from_secs(config.download.timeout_secs),
            config.download.max_retries,
            config.download.backoff_factor,
            config.download.max_file_size,
        );

        let data_dir = config.data_dir.clone();
        let extraction_enabled = config.extraction.enabled;
        let config = Arc::new(config);

        let ctx = AdapterContext {
            fetcher,
            documents,
            extractions,
            source_state,
            extractor,
            data_dir,
            extraction_enabled,
            config,
        };

        Ok(Self { ctx })
    }

    /// Run discovery + download for one named adapter, or every enabled
    /// adapter in catalog order when `source` is `None`.
    pub async fn run(&self, source: Option<&str>) -> Result<()> {
        let all = adapters::all_adapters();

        let selected: Vec<&Box<dyn Adapter>> = match source {
            Some(source) => {
                let found = all.iter().find(|a| a.name() == source);
                match found {
                    Some(a) => vec![a],
                    None => return Err(OrchestratorError::UnknownSource(source.to_string())),
                }
            }
            None => all.iter().collect(),
        };

        for adapter in selected {
            let name = adapter.name();
            if !self.ctx.config.source_enabled(name) {
                println!("[{}] disabled in config, skipping.", name);
                continue;
            }

            println!("\n{}", "=".repeat(60));
            println!("  Source: {}", name);
            println!("{}", "=".repeat(60));

            let stats = adapter.run(&self.ctx).await;
            println!(
                "[{}] discovered={} downloaded={} skipped={} failed={}",
                name, stats.discovered, stats.downloaded, stats.skipped, stats.failed
            );
        }

        Ok(())
    }

    /// Run text extraction against every downloaded document that has no
    /// completed extraction yet, optionally restricted to one source.
    pub async fn extract_only(&self, source: Option<&str>) -> Result<()> {
        let docs = self.ctx.documents.get_downloaded_without_extraction(source)?;
        println!("Found {} documents needing text extraction.", docs.len());

        for doc in docs {
            let is_pdf = doc.filename.to_lowercase().ends_with(".pdf");
            let exists = doc.local_path.as_deref().map(|p| Path::new(p).exists()).unwrap_or(false);
            if !is_pdf || !exists {
                continue;
            }

            match extract::extract_and_record(&self.ctx.extractor, &self.ctx.extractions, &doc, &self.ctx.data_dir) {
                Ok(extraction) => {
                    println!(
                        "  [{}] {}: {:?} pages, {:?} chars, {} OCR",
                        doc.source,
                        doc.filename,
                        extraction.page_count.unwrap_or(0),
                        extraction.char_count.unwrap_or(0),
                        extraction.ocr_pages
                    );
                }
                Err(e) => {
                    println!("  [{}] {}: FAILED — {}", doc.source, doc.filename, e);
                }
            }
        }

        Ok(())
    }

    /// Print per-source x status document counts/byte totals and
    /// per-source extraction counts, IEC-formatted.
    pub fn print_stats(&self) -> Result<()> {
        let doc_stats = self.ctx.documents.get_stats()?;

        println!("\n{}", "=".repeat(70));
        println!("  DOWNLOAD STATISTICS");
        println!("{}", "=".repeat(70));
        println!("{:<20} {:<12} {:>8} {:>14}", "Source", "Status", "Count", "Size");
        println!("{}", "-".repeat(70));

        let mut total_docs = 0i64;
        let mut total_bytes = 0i64;
        for row in &doc_stats {
            println!(
                "{:<20} {:<12} {:>8} {:>14}",
                row.source,
                row.download_status,
                row.count,
                format_bytes(row.total_bytes)
            );
            total_docs += row.count;
            if row.download_status == "downloaded" {
                total_bytes += row.total_bytes;
            }
        }
        println!("{}", "-".repeat(70));
        println!("{:<20} {:<12} {:>8} {:>14}", "TOTAL", "", total_docs, format_bytes(total_bytes));

        let ext_stats = self.ctx.extractions.get_stats()?;
        if !ext_stats.is_empty() {
            println!("\n{}", "=".repeat(70));
            println!("  EXTRACTION STATISTICS");
            println!("{}", "=".repeat(70));
            println!(
                "{:<20} {:<12} {:>8} {:>14} {:>10}",
                "Source", "Status", "Count", "Chars", "OCR Pages"
            );
            println!("{}", "-".repeat(70));
            for row in &ext_stats {
                println!(
                    "{:<20} {:<12} {:>8} {:>14} {:>10}",
                    row.source, row.status, row.count, row.total_chars, row.total_ocr_pages
                );
            }
        }

        println!();
        Ok(())
    }
}

/// Format a byte count with IEC units (1024-based divisors, B/KiB/MiB/GiB
/// symbols), matching spec.md §4.6's stats output requirement.
pub fn format_bytes(n: i64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes = n as f64;
    if n < 1024 {
        format!("{} B", n)
    } else if bytes < MIB {
        format!("{:.1} KiB", bytes / KIB)
    } else if bytes < GIB {
        format!("{:.1} MiB", bytes / MIB)
    } else {
        format!("{:.2} GiB", bytes / GIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_under_1024_is_bytes() {
        assert_eq!(format_bytes(512), "512 B");
    }

    #[test]
    fn test_format_bytes_kib() {
        assert_eq!(format_bytes(2048), "2.0 KiB");
    }

    #[test]
    fn test_format_bytes_mib() {
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_format_bytes_gib() {
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
    }

    #[test]
    fn test_format_bytes_zero() {
        assert_eq!(format_bytes(0), "0 B");
    }
}
