//! Source adapter framework: the base discovery/run protocol and the
//! registry of per-site adapters.
//!
//! Every adapter yields `(url, metadata)` pairs from `discover()`. Most
//! adapters are driven by the shared [`run_default`] loop; `torrents` and
//! `epsteingraph` override `run()` entirely because their acquisition
//! model isn't a plain HTTP GET per URL.

mod courtlistener;
mod direct_urls;
mod documentcloud;
mod doj;
mod epsteingraph;
mod fbi_vault;
mod house_oversight;
mod html_scrape;
mod internet_archive;
mod torrents;

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use thiserror::Error;

use crate::config::Config;
use crate::extract::{self, TextExtractor};
use crate::fetch::HttpFetcher;
use crate::models::{Document, DownloadStatus};
use crate::repository::{DocumentRepository, ExtractionRepository, SourceStateRepository};
use crate::storage;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("api token not configured for {0}, skipping")]
    ApiUnauthenticated(String),
    #[error("unexpected api response shape: {0}")]
    ApiResponseShape(String),
}

/// A discovered document, yielded by `discover()` before it has been
/// catalogued or downloaded.
pub type Discovery = (String, serde_json::Value);

/// A boxed, lazily-evaluated stream of discoveries. Built with
/// `async_stream::stream!` in each adapter so pagination only issues the
/// next request once the orchestrator pulls the next item.
pub type DiscoveryStream<'a> = Pin<Box<dyn Stream<Item = Discovery> + Send + 'a>>;

/// Shared dependencies every adapter runs against.
pub struct AdapterContext {
    pub fetcher: HttpFetcher,
    pub documents: Arc<DocumentRepository>,
    pub extractions: Arc<ExtractionRepository>,
    pub source_state: Arc<SourceStateRepository>,
    pub extractor: Arc<TextExtractor>,
    pub data_dir: PathBuf,
    pub extraction_enabled: bool,
    pub config: Arc<Config>,
}

impl AdapterContext {
    pub fn rate_limit_for(&self, source: &str) -> f64 {
        self.config.rate_limit_for(source)
    }
}

/// Counters printed at the end of an adapter's run, matching the
/// `discovered/downloaded/skipped/failed` line in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub discovered: u64,
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Capability set every source adapter implements: a stable `name` used
/// as the catalog's `source` column and a `discover` stream. `run` has a
/// default implementation (the shared acquisition loop); adapters whose
/// acquisition model isn't "GET each discovered URL" override it.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn discover<'a>(&'a self, ctx: &'a AdapterContext) -> DiscoveryStream<'a>;

    async fn run(&self, ctx: &AdapterContext) -> RunStats {
        run_default(self, ctx).await
    }
}

/// The base run loop shared by every adapter that acquires content over
/// plain HTTP: discover, dedup by URL, download, content-dedup by hash,
/// extract.
pub async fn run_default<A: Adapter + ?Sized>(adapter: &A, ctx: &AdapterContext) -> RunStats {
    use futures_util::StreamExt;

    let name = adapter.name();
    tracing::info!("[{}] starting discovery...", name);
    let mut stats = RunStats::default();
    let mut stream = adapter.discover(ctx);

    while let Some((url, meta)) = stream.next().await {
        stats.discovered += 1;

        if ctx.documents.url_exists(&url).unwrap_or(false) {
            stats.skipped += 1;
            continue;
        }

        let source_id = meta
            .get("source_id")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let filename = meta
            .get("filename")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| filename_from_url(&url));
        let title = meta
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| filename.clone());

        let doc = Document::new(url.clone(), name.to_string())
            .with_source_id(source_id.clone())
            .with_filename(filename.clone())
            .with_title(title)
            .with_metadata(meta);

        let doc_id = match ctx.documents.insert(&doc) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("[{}] failed to catalog {}: {}", name, url, e);
                stats.failed += 1;
                continue;
            }
        };

        let rate_limit = ctx.rate_limit_for(name);
        let expect_binary = filename.to_lowercase().ends_with(".pdf") || filename.to_lowercase().ends_with(".zip");

        match ctx.fetcher.download(name, &url, rate_limit, expect_binary).await {
            Err(e) => {
                let _ = ctx.documents.update_download(doc_id, DownloadStatus::Failed, None, None, None, Some(&e.to_string()));
                stats.failed += 1;
                tracing::error!("[{}] failed: {}: {}", name, filename, e);
                continue;
            }
            Ok(downloaded) => {
                if let Some(existing) = ctx.documents.find_by_sha256(&downloaded.sha256).unwrap_or(None) {
                    let _ = ctx.documents.update_download(
                        doc_id,
                        DownloadStatus::Skipped,
                        None,
                        Some(&downloaded.sha256),
                        None,
                        Some(&format!("duplicate of {}", existing)),
                    );
                    stats.skipped += 1;
                    tracing::info!("[{}] content dedup: {} matches {}", name, filename, existing);
                    continue;
                }

                let dest_path = storage::destination_path(&ctx.data_dir, name, &source_id, &filename);
                if let Err(e) = std::fs::create_dir_all(dest_path.parent().unwrap_or(Path::new("."))) {
                    let _ = ctx.documents.update_download(doc_id, DownloadStatus::Failed, None, None, None, Some(&e.to_string()));
                    stats.failed += 1;
                    continue;
                }
                if let Err(e) = std::fs::write(&dest_path, &downloaded.bytes) {
                    let _ = ctx.documents.update_download(doc_id, DownloadStatus::Failed, None, None, None, Some(&e.to_string()));
                    stats.failed += 1;
                    continue;
                }

                let file_size = downloaded.bytes.len() as u64;
                let _ = ctx.documents.update_download(
                    doc_id,
                    DownloadStatus::Downloaded,
                    Some(&dest_path.to_string_lossy()),
                    Some(&downloaded.sha256),
                    Some(file_size),
                    None,
                );
                stats.downloaded += 1;
                tracing::info!("[{}] downloaded: {} ({} bytes)", name, filename, file_size);

                if ctx.extraction_enabled && filename.to_lowercase().ends_with(".pdf") {
                    if let Ok(Some(document)) = ctx.documents.get(doc_id) {
                        if let Err(e) = extract::extract_and_record(&ctx.extractor, &ctx.extractions, &document, &ctx.data_dir) {
                            tracing::error!("[{}] extraction failed for {}: {}", name, filename, e);
                        }
                    }
                }
            }
        }
    }

    tracing::info!(
        "[{}] done: {} discovered, {} downloaded, {} skipped, {} failed",
        name,
        stats.discovered,
        stats.downloaded,
        stats.skipped,
        stats.failed
    );

    stats
}

fn filename_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments().and_then(|mut s| s.next_back().map(|s| s.to_string())))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document.pdf".to_string())
}

/// Construct every known adapter in the catalog's canonical source order.
pub fn all_adapters() -> Vec<Box<dyn Adapter>> {
    vec![
        Box::new(doj::DojAdapter),
        Box::new(direct_urls::DirectUrlsAdapter),
        Box::new(fbi_vault::FbiVaultAdapter),
        Box::new(internet_archive::InternetArchiveAdapter),
        Box::new(documentcloud::DocumentCloudAdapter),
        Box::new(house_oversight::HouseOversightAdapter),
        Box::new(courtlistener::CourtListenerAdapter),
        Box::new(torrents::TorrentsAdapter),
        Box::new(epsteingraph::EpsteinGraphAdapter),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_url_uses_last_path_segment() {
        assert_eq!(filename_from_url("https://example.com/a/b/report.pdf"), "report.pdf");
    }

    #[test]
    fn test_filename_from_url_falls_back_on_empty_path() {
        assert_eq!(filename_from_url("https://example.com"), "document.pdf");
    }

    #[test]
    fn test_all_adapters_registers_nine_in_order() {
        let adapters = all_adapters();
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "doj",
                "direct_urls",
                "fbi_vault",
                "internet_archive",
                "documentcloud",
                "house_oversight",
                "courtlistener",
                "torrents",
                "epsteingraph",
            ]
        );
    }
}
