//! Internet Archive: a set of verified collection identifiers plus the
//! scrape-API search for additional items.

use std::collections::HashSet;

use async_stream::stream;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use super::{Adapter, AdapterContext, Discovery, DiscoveryStream};

const SEARCH_URL: &str = "https://archive.org/services/search/v1/scrape";
const METADATA_URL: &str = "https://archive.org/metadata/{identifier}";
const DOWNLOAD_URL: &str = "https://archive.org/download/{identifier}/{filename}";

const KNOWN_COLLECTIONS: &[&str] = &[
    "epstein-documents-943-pages",
    "epstein-documents-943-pages-1",
    "j-epstein-files",
    "final-epstein-documents",
    "jeffrey-epstein-court-documents",
    "epsteindocs",
    "epstein-doj-datasets-9-11-jan2026",
    "Epstein-Data-Sets-So-Far",
];

const QUERIES: &[&str] = &[
    "subject:\"jeffrey epstein\" AND mediatype:texts",
    "subject:\"ghislaine maxwell\" AND mediatype:texts",
    "creator:\"Department of Justice\" AND title:\"epstein\" AND mediatype:texts",
];

const VALID_EXTS: &[&str] = &[".pdf", ".txt", ".doc", ".docx", ".zip"];

pub struct InternetArchiveAdapter;

impl InternetArchiveAdapter {
    fn collection_files<'a>(
        ctx: &'a AdapterContext,
        name: &'a str,
        rate_limit: f64,
        identifier: String,
    ) -> impl futures_util::Stream<Item = Discovery> + Send + 'a {
        async_stream::stream! {
            let url = METADATA_URL.replace("{identifier}", &identifier);
            let data: serde_json::Value = match ctx.fetcher.fetch_json(name, &url, rate_limit).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("[{}] failed to get metadata for {}: {}", name, identifier, e);
                    return;
                }
            };

            let files = data.get("files").and_then(|v| v.as_array()).cloned().unwrap_or_default();
            let title = match data.get("metadata").and_then(|m| m.get("title")) {
                Some(serde_json::Value::Array(arr)) => arr
                    .first()
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| identifier.clone()),
                Some(serde_json::Value::String(s)) => s.clone(),
                _ => identifier.clone(),
            };

            for f in files {
                let fname = f.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
                if fname.is_empty() {
                    continue;
                }
                if !VALID_EXTS.iter().any(|ext| fname.to_lowercase().ends_with(ext)) {
                    continue;
                }

                let download_url = DOWNLOAD_URL
                    .replace("{identifier}", &identifier)
                    .replace("{filename}", &fname);

                let safe_name = format!("{}__{}", identifier, fname).replace('/', "_");
                let meta = serde_json::json!({
                    "source_id": safe_name,
                    "filename": safe_name,
                    "title": format!("{} — {}", title, fname),
                    "ia_identifier": identifier,
                });
                yield (download_url, meta) as Discovery;
            }
        }
    }
}

impl Adapter for InternetArchiveAdapter {
    fn name(&self) -> &'static str {
        "internet_archive"
    }

    fn discover<'a>(&'a self, ctx: &'a AdapterContext) -> DiscoveryStream<'a> {
        Box::pin(stream! {
            use futures_util::StreamExt;

            let name = self.name();
            let rate_limit = ctx.rate_limit_for(name);
            let mut seen_identifiers: HashSet<String> = HashSet::new();

            for identifier in KNOWN_COLLECTIONS {
                if seen_identifiers.insert(identifier.to_string()) {
                    let mut inner = Box::pin(Self::collection_files(ctx, name, rate_limit, identifier.to_string()));
                    while let Some(item) = inner.next().await {
                        yield item;
                    }
                }
            }

            let mut state = ctx.source_state.get(name).unwrap_or_else(|_| serde_json::json!({}));

            for (i, query) in QUERIES.iter().enumerate() {
                let cursor_key = format!("cursor_{}", i);
                let mut cursor = state.get(&cursor_key).and_then(|v| v.as_str()).map(|s| s.to_string());
                let params_base = format!(
                    "?q={}&fields=identifier,title&count=100",
                    utf8_percent_encode(query, NON_ALPHANUMERIC)
                );

                loop {
                    let mut url = format!("{}{}", SEARCH_URL, params_base);
                    if let Some(c) = &cursor {
                        url.push_str(&format!("&cursor={}", c));
                    }

                    let data: serde_json::Value = match ctx.fetcher.fetch_json(name, &url, rate_limit).await {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::error!("[{}] search api error: {}", name, e);
                            break;
                        }
                    };

                    let items = data.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                    if items.is_empty() {
                        break;
                    }

                    for item in items {
                        let identifier = item.get("identifier").and_then(|v| v.as_str()).unwrap_or("").to_string();
                        if !identifier.is_empty() && seen_identifiers.insert(identifier.clone()) {
                            let mut inner = Box::pin(Self::collection_files(ctx, name, rate_limit, identifier));
                            while let Some(item) = inner.next().await {
                                yield item;
                            }
                        }
                    }

                    cursor = data.get("cursor").and_then(|v| v.as_str()).map(|s| s.to_string());
                    match &cursor {
                        Some(c) => {
                            state[&cursor_key] = serde_json::json!(c);
                            let _ = ctx.source_state.save(name, &state);
                        }
                        None => break,
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_collections_count() {
        assert_eq!(KNOWN_COLLECTIONS.len(), 8);
    }

    #[test]
    fn test_queries_count() {
        assert_eq!(QUERIES.len(), 3);
    }

    #[test]
    fn test_valid_exts_includes_pdf_and_zip() {
        assert!(VALID_EXTS.contains(&".pdf"));
        assert!(VALID_EXTS.contains(&".zip"));
    }
}
