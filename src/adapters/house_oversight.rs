//! House Oversight Committee document releases: a small, fixed set of
//! committee pages, each scraped for PDF links.

use async_stream::stream;

use super::html_scrape::extract_pdf_links;
use super::{Adapter, AdapterContext, Discovery, DiscoveryStream};

const COMMITTEE_PAGES: &[&str] = &[
    "https://oversight.house.gov/release/committee-releases-epstein-estate-documents/",
    "https://oversight.house.gov/release/committee-releases-epstein-birthday-book/",
    "https://oversight.house.gov/release/committee-releases-additional-epstein-documents/",
];

pub struct HouseOversightAdapter;

impl Adapter for HouseOversightAdapter {
    fn name(&self) -> &'static str {
        "house_oversight"
    }

    fn discover<'a>(&'a self, ctx: &'a AdapterContext) -> DiscoveryStream<'a> {
        Box::pin(stream! {
            let name = self.name();
            let rate_limit = ctx.rate_limit_for(name);

            for page_url in COMMITTEE_PAGES {
                match ctx.fetcher.fetch_text(name, page_url, rate_limit).await {
                    Ok(html) => {
                        for link in extract_pdf_links(&html, page_url) {
                            let meta = serde_json::json!({
                                "source_id": format!("house-{}", link.filename),
                                "filename": link.filename,
                                "title": format!("House Oversight: {}", link.filename),
                            });
                            yield (link.url, meta) as Discovery;
                        }
                    }
                    Err(e) => tracing::error!("[{}] failed to scrape {}: {}", name, page_url, e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_committee_pages_count() {
        assert_eq!(COMMITTEE_PAGES.len(), 3);
    }

    #[test]
    fn test_committee_pages_are_https() {
        assert!(COMMITTEE_PAGES.iter().all(|u| u.starts_with("https://")));
    }
}
