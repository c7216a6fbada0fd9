//! DocumentCloud: public search API, cursor-paginated via the response's
//! `next` URL.

use std::collections::HashSet;

use async_stream::stream;

use super::{Adapter, AdapterContext, Discovery, DiscoveryStream};

const SEARCH_URL: &str = "https://api.www.documentcloud.org/api/documents/search/";

const QUERIES: &[&str] = &[
    "jeffrey epstein",
    "ghislaine maxwell",
    "epstein flight logs",
    "epstein grand jury",
];

pub struct DocumentCloudAdapter;

impl Adapter for DocumentCloudAdapter {
    fn name(&self) -> &'static str {
        "documentcloud"
    }

    fn discover<'a>(&'a self, ctx: &'a AdapterContext) -> DiscoveryStream<'a> {
        Box::pin(stream! {
            let name = self.name();
            let rate_limit = ctx.rate_limit_for(name);
            let mut seen_ids: HashSet<String> = HashSet::new();

            for query in QUERIES {
                let mut url = format!("{}?q={}&per_page=100", SEARCH_URL, query);

                loop {
                    let data: serde_json::Value = match ctx.fetcher.fetch_json(name, &url, rate_limit).await {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::error!("[{}] search failed for '{}': {}", name, query, e);
                            break;
                        }
                    };

                    let results = data.get("results").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                    if results.is_empty() {
                        break;
                    }

                    for doc in &results {
                        let doc_id = doc.get("id").map(|v| v.to_string().trim_matches('"').to_string()).unwrap_or_default();
                        if doc_id.is_empty() || seen_ids.contains(&doc_id) {
                            continue;
                        }
                        seen_ids.insert(doc_id.clone());

                        let slug = doc.get("slug").and_then(|v| v.as_str()).unwrap_or("document").to_string();
                        let title = doc
                            .get("title")
                            .and_then(|v| v.as_str())
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| format!("DocumentCloud {}", doc_id));
                        let pages = doc.get("page_count").and_then(|v| v.as_u64()).unwrap_or(0);

                        let pdf_url = format!("https://assets.documentcloud.org/documents/{}/{}.pdf", doc_id, slug);
                        let meta = serde_json::json!({
                            "source_id": doc_id,
                            "filename": format!("{}-{}.pdf", doc_id, slug),
                            "title": title,
                            "dc_id": doc_id,
                            "pages": pages,
                        });
                        yield (pdf_url, meta) as Discovery;
                    }

                    match data.get("next").and_then(|v| v.as_str()) {
                        Some(next_url) => {
                            url = next_url.to_string();
                            let state = serde_json::json!({"next_url": url, "query": query});
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
    fn test_queries_count() {
        assert_eq!(QUERIES.len(), 4);
    }

    #[test]
    fn test_search_url_is_api_host() {
        assert!(SEARCH_URL.contains("api.www.documentcloud.org"));
    }
}
