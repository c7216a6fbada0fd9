//! Shared PDF-link scraping for the HTML-scrape adapters (`doj`,
//! `house_oversight`). Case-insensitive match of `href` values ending in
//! `.pdf`, resolved against the page URL, percent-decoded for the
//! on-disk filename. Duplicates within a page are suppressed.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use scraper::{Html, Selector};

/// A single scraped PDF link.
pub struct PdfLink {
    pub url: String,
    pub filename: String,
}

/// Extract every distinct `.pdf` link from an HTML page, resolved
/// against `base_url`.
pub fn extract_pdf_links(html: &str, base_url: &str) -> Vec<PdfLink> {
    let base = match url::Url::parse(base_url) {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };

    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !href.to_lowercase().ends_with(".pdf") {
            continue;
        }

        let resolved = match base.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        let resolved_str = resolved.to_string();

        if !seen.insert(resolved_str.clone()) {
            continue;
        }

        let raw_filename = resolved
            .path_segments()
            .and_then(|mut s| s.next_back())
            .unwrap_or("document.pdf");
        let filename = percent_decode_str(raw_filename).decode_utf8_lossy().into_owned();

        links.push(PdfLink {
            url: resolved_str,
            filename,
        });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_pdf_links_resolves_relative_urls() {
        let html = r#"<html><body><a href="/docs/report.pdf">Report</a></body></html>"#;
        let links = extract_pdf_links(html, "https://example.com/page");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/docs/report.pdf");
        assert_eq!(links[0].filename, "report.pdf");
    }

    #[test]
    fn test_extract_pdf_links_is_case_insensitive() {
        let html = r#"<a href="/a.PDF">a</a>"#;
        let links = extract_pdf_links(html, "https://example.com/");
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_extract_pdf_links_dedups_within_page() {
        let html = r#"<a href="/a.pdf">one</a><a href="/a.pdf">two</a>"#;
        let links = extract_pdf_links(html, "https://example.com/");
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_extract_pdf_links_percent_decodes_filename() {
        let html = r#"<a href="/Epstein%20Docs.pdf">x</a>"#;
        let links = extract_pdf_links(html, "https://example.com/");
        assert_eq!(links[0].filename, "Epstein Docs.pdf");
    }

    #[test]
    fn test_extract_pdf_links_ignores_non_pdf_hrefs() {
        let html = r#"<a href="/index.html">x</a>"#;
        let links = extract_pdf_links(html, "https://example.com/");
        assert!(links.is_empty());
    }
}
