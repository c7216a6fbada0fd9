//! Curated list of verified documents with well-known, stable URLs.

use async_stream::stream;

use super::{Adapter, AdapterContext, Discovery, DiscoveryStream};

struct StaticDoc {
    url: &'static str,
    source_id: &'static str,
    filename: &'static str,
    title: &'static str,
}

const DOCUMENTS: &[StaticDoc] = &[
    StaticDoc {
        url: "https://www.justice.gov/usao-sdny/press-release/file/1180481/download",
        source_id: "sdny-indictment",
        filename: "epstein-sdny-indictment-2019.pdf",
        title: "SDNY Indictment of Jeffrey Epstein (2019)",
    },
    StaticDoc {
        url: "https://www.justice.gov/usao-sdny/press-release/file/1291481/download",
        source_id: "maxwell-indictment",
        filename: "maxwell-indictment-2020.pdf",
        title: "Indictment of Ghislaine Maxwell (2020)",
    },
    StaticDoc {
        url: "https://www.justice.gov/usao-sdny/press-release/file/1380016/download",
        source_id: "maxwell-superseding",
        filename: "maxwell-superseding-indictment-2021.pdf",
        title: "Superseding Indictment of Ghislaine Maxwell (2021)",
    },
    StaticDoc {
        url: "https://oig.justice.gov/sites/default/files/reports/24-043.pdf",
        source_id: "bop-death-report",
        filename: "doj-oig-epstein-death-report.pdf",
        title: "DOJ OIG Report on Epstein Death at MCC",
    },
    StaticDoc {
        url: "https://assets.documentcloud.org/documents/1507315/epstein-flight-manifests.pdf",
        source_id: "flight-logs",
        filename: "epstein-flight-manifests.pdf",
        title: "Epstein Flight Manifests / Logs",
    },
    StaticDoc {
        url: "https://assets.documentcloud.org/documents/1508273/jeffrey-epsteins-little-black-book-redacted.pdf",
        source_id: "black-book",
        filename: "epstein-little-black-book-redacted.pdf",
        title: "Jeffrey Epstein's Little Black Book (Redacted)",
    },
    StaticDoc {
        url: "https://assets.documentcloud.org/documents/6250552/Epstein-Police-Report.pdf",
        source_id: "pb-police-report",
        filename: "epstein-palm-beach-police-report.pdf",
        title: "Palm Beach Police Report - Jeffrey Epstein",
    },
    StaticDoc {
        url: "https://assets.documentcloud.org/documents/1508967/non-prosecution-agreement.pdf",
        source_id: "npa-2007",
        filename: "epstein-non-prosecution-agreement-2007.pdf",
        title: "Epstein Non-Prosecution Agreement (2007)",
    },
];

pub struct DirectUrlsAdapter;

impl Adapter for DirectUrlsAdapter {
    fn name(&self) -> &'static str {
        "direct_urls"
    }

    fn discover<'a>(&'a self, _ctx: &'a AdapterContext) -> DiscoveryStream<'a> {
        Box::pin(stream! {
            for doc in DOCUMENTS {
                let meta = serde_json::json!({
                    "source_id": doc.source_id,
                    "filename": doc.filename,
                    "title": doc.title,
                });
                yield (doc.url.to_string(), meta) as Discovery;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_have_distinct_source_ids() {
        let ids: std::collections::HashSet<&str> = DOCUMENTS.iter().map(|d| d.source_id).collect();
        assert_eq!(ids.len(), DOCUMENTS.len());
    }

    #[test]
    fn test_documents_count_matches_curated_list() {
        assert_eq!(DOCUMENTS.len(), 8);
    }
}
