//! DOJ Epstein Library: 12 data sets released under the Epstein Files
//! Transparency Act, each a paginated HTML index of PDF links, plus a
//! handful of fixed court-record pages.

use async_stream::stream;

use super::html_scrape::extract_pdf_links;
use super::{Adapter, AdapterContext, Discovery, DiscoveryStream};

const DATA_SET_BASE: &str = "https://www.justice.gov/epstein/doj-disclosures/data-set-{n}-files";

/// Upper bound on pages per data set, observed empirically. The real
/// page count may be lower — an empty page stops the scan early — but
/// never higher, so this list is a cap, not a promise.
const DATA_SET_PAGES: &[(u32, u32)] = &[
    (1, 62),
    (2, 11),
    (3, 1),
    (4, 3),
    (5, 2),
    (6, 1),
    (7, 1),
    (8, 219),
    (9, 1974),
    (10, 10027),
    (11, 2595),
    (12, 2),
];

const COURT_PAGES: &[&str] = &[
    "https://www.justice.gov/epstein/court-records/giuffre-v-maxwell-no-115-cv-07433-sdny-2015",
    "https://www.justice.gov/usao-sdny/united-states-v-jeffrey-epstein",
    "https://www.justice.gov/usao-sdny/united-states-v-ghislaine-maxwell",
];

fn max_page(ds_num: u32) -> u32 {
    DATA_SET_PAGES.iter().find(|(n, _)| *n == ds_num).map(|(_, p)| *p).unwrap_or(1)
}

pub struct DojAdapter;

impl Adapter for DojAdapter {
    fn name(&self) -> &'static str {
        "doj"
    }

    fn discover<'a>(&'a self, ctx: &'a AdapterContext) -> DiscoveryStream<'a> {
        Box::pin(stream! {
            let name = self.name();
            let rate_limit = ctx.rate_limit_for(name);
            let mut state = ctx.source_state.get(name).unwrap_or_else(|_| serde_json::json!({}));

            for ds_num in 1..=12u32 {
                let upper = max_page(ds_num);
                let state_key = format!("ds{}_page", ds_num);
                let start_page = state.get(&state_key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;

                tracing::info!("[{}] data set {}: pages {}-{}", name, ds_num, start_page, upper);

                for page in start_page..=upper {
                    let base_url = DATA_SET_BASE.replace("{n}", &ds_num.to_string());
                    let url = if page == 0 { base_url.clone() } else { format!("{}?page={}", base_url, page) };

                    let mut count = 0u32;
                    let mut page_failed = false;
                    match ctx.fetcher.fetch_text(name, &url, rate_limit).await {
                        Ok(html) => {
                            for link in extract_pdf_links(&html, &url) {
                                count += 1;
                                let meta = serde_json::json!({
                                    "source_id": format!("ds{}-{}", ds_num, link.filename),
                                    "filename": link.filename,
                                    "title": format!("DOJ DataSet {}: {}", ds_num, link.filename),
                                    "dataset": ds_num,
                                });
                                yield (link.url, meta) as Discovery;
                            }
                        }
                        Err(e) => {
                            // A broken page doesn't end the data set — log
                            // and move on to the next page rather than
                            // aborting the rest of the scan.
                            page_failed = true;
                            tracing::error!("[{}] data set {} page {}: {}", name, ds_num, page, e);
                        }
                    }

                    state[&state_key] = serde_json::json!(page);
                    let _ = ctx.source_state.save(name, &state);

                    if count == 0 && page > 0 && !page_failed {
                        tracing::info!("[{}] data set {}: no PDFs on page {}, stopping", name, ds_num, page);
                        break;
                    }
                }
            }

            for page_url in COURT_PAGES {
                match ctx.fetcher.fetch_text(name, page_url, rate_limit).await {
                    Ok(html) => {
                        for link in extract_pdf_links(&html, page_url) {
                            let meta = serde_json::json!({
                                "source_id": format!("court-{}", link.filename),
                                "filename": link.filename,
                                "title": format!("DOJ Court: {}", link.filename),
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
    fn test_max_page_known_dataset() {
        assert_eq!(max_page(10), 10027);
    }

    #[test]
    fn test_max_page_unknown_dataset_defaults_to_one() {
        assert_eq!(max_page(99), 1);
    }

    #[test]
    fn test_data_set_pages_covers_all_twelve() {
        assert_eq!(DATA_SET_PAGES.len(), 12);
    }
}
