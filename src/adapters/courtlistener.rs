//! CourtListener REST API: known Epstein/Maxwell dockets plus a couple of
//! search queries for additional ones. Requires a free API token; the
//! adapter logs a warning and discovers nothing without one.

use std::collections::HashSet;

use async_stream::stream;

use super::{Adapter, AdapterContext, Discovery, DiscoveryStream};

const API_BASE: &str = "https://www.courtlistener.com/api/rest/v4";

const DOCKET_IDS: &[&str] = &[
    "4154484",  // Giuffre v. Maxwell (SDNY 1:15-cv-07433)
    "17318376", // United States v. Maxwell (SDNY 1:20-cr-00330)
    "6302530",  // United States v. Epstein (SDFL 9:08-cr-80736)
    "67534580", // Doe v. Epstein
];

const SEARCH_QUERIES: &[&str] = &["jeffrey epstein", "ghislaine maxwell trafficking"];

fn recap_pdf_url(filepath: &str) -> String {
    if filepath.starts_with("http") {
        filepath.to_string()
    } else {
        format!("https://storage.courtlistener.com/{}", filepath)
    }
}

pub struct CourtListenerAdapter;

impl CourtListenerAdapter {
    fn docket_entries<'a>(
        ctx: &'a AdapterContext,
        name: &'a str,
        rate_limit: f64,
        token: &'a str,
        docket_id: String,
    ) -> impl futures_util::Stream<Item = Discovery> + Send + 'a {
        async_stream::stream! {
            let mut url = format!("{}/docket-entries/?docket={}&page_size=100", API_BASE, docket_id);
            let mut seen = HashSet::new();

            loop {
                let data: serde_json::Value = match ctx
                    .fetcher
                    .fetch_json_authenticated(name, &url, rate_limit, token)
                    .await
                {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::error!("[{}] docket {} error: {}", name, docket_id, e);
                        break;
                    }
                };

                let results = data.get("results").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                for entry in &results {
                    let recap_documents = entry.get("recap_documents").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                    for rd in recap_documents {
                        let doc_id = rd.get("id").map(|v| v.to_string()).unwrap_or_default();
                        if doc_id.is_empty() || !seen.insert(doc_id.clone()) {
                            continue;
                        }

                        let filepath = rd
                            .get("filepath_ia")
                            .and_then(|v| v.as_str())
                            .filter(|s| !s.is_empty())
                            .or_else(|| rd.get("filepath_local").and_then(|v| v.as_str()))
                            .filter(|s| !s.is_empty());
                        let Some(filepath) = filepath else { continue };

                        let pdf_url = recap_pdf_url(filepath);
                        let entry_number = entry.get("entry_number").cloned().unwrap_or(serde_json::Value::Null);
                        let desc = rd
                            .get("description")
                            .and_then(|v| v.as_str())
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| format!("Entry {}", entry_number));

                        let meta = serde_json::json!({
                            "source_id": doc_id,
                            "filename": format!("cl-{}-{}.pdf", docket_id, doc_id),
                            "title": desc,
                            "docket_id": docket_id,
                            "entry_number": entry_number,
                        });
                        yield (pdf_url, meta) as Discovery;
                    }
                }

                match data.get("next").and_then(|v| v.as_str()) {
                    Some(next_url) => url = next_url.to_string(),
                    None => break,
                }
            }
        }
    }
}

impl Adapter for CourtListenerAdapter {
    fn name(&self) -> &'static str {
        "courtlistener"
    }

    fn discover<'a>(&'a self, ctx: &'a AdapterContext) -> DiscoveryStream<'a> {
        Box::pin(stream! {
            use futures_util::StreamExt;

            let name = self.name();
            let Some(token) = ctx.config.sources.get(name).and_then(|s| s.api_token.as_deref()) else {
                tracing::warn!(
                    "[{}] no api token configured, skipping. Get a free token at https://www.courtlistener.com/sign-in/",
                    name
                );
                return;
            };
            let rate_limit = ctx.rate_limit_for(name);

            for docket_id in DOCKET_IDS {
                let mut inner = Box::pin(Self::docket_entries(ctx, name, rate_limit, token, docket_id.to_string()));
                while let Some(item) = inner.next().await {
                    yield item;
                }
            }

            for query in SEARCH_QUERIES {
                let url = format!("{}/search/?q={}&type=r&page_size=20", API_BASE, query);
                let data: serde_json::Value = match ctx.fetcher.fetch_json_authenticated(name, &url, rate_limit, token).await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::error!("[{}] search error for '{}': {}", name, query, e);
                        continue;
                    }
                };

                let results = data.get("results").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                for result in results {
                    if let Some(docket_id) = result.get("docket_id") {
                        let docket_id = docket_id.to_string();
                        let mut inner = Box::pin(Self::docket_entries(ctx, name, rate_limit, token, docket_id));
                        while let Some(item) = inner.next().await {
                            yield item;
                        }
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
    fn test_recap_pdf_url_passes_through_absolute_urls() {
        assert_eq!(recap_pdf_url("https://ia.example/doc.pdf"), "https://ia.example/doc.pdf");
    }

    #[test]
    fn test_recap_pdf_url_prefixes_relative_paths() {
        assert_eq!(
            recap_pdf_url("recap/gov.uscourts.nysd.1/doc.pdf"),
            "https://storage.courtlistener.com/recap/gov.uscourts.nysd.1/doc.pdf"
        );
    }

    #[test]
    fn test_docket_ids_count() {
        assert_eq!(DOCKET_IDS.len(), 4);
    }
}
