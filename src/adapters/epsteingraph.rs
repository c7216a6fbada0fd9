//! EpsteinGraph.com: a processed document/person-graph REST API.
//!
//! Unlike the other adapters, this one doesn't download raw PDFs — it
//! pulls pre-processed person profiles, connections, documents, and
//! timelines as JSON. The `/people/top` endpoint caps out at 200 results
//! and ignores `offset`, so exhausting the ~50k-person population needs
//! a breadth-first snowball crawl outward from a seed set, following
//! connection edges discovered on each profile. Overrides `run()`
//! entirely since the acquisition model isn't "GET each discovered URL".

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use async_stream::stream;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use super::{Adapter, AdapterContext, Discovery, DiscoveryStream, RunStats};
use crate::fetch::FetchError;
use crate::models::{Document, DownloadStatus};
use crate::storage;

const API_BASE: &str = "https://api.epsteingraph.com";
const DOCS_PER_PAGE: u32 = 100;

/// Persist `source_state` after this many profile completions, and once
/// more at the end of the run.
const CHECKPOINT_EVERY: usize = 25;

const KNOWN_ROLES: &[&str] = &[
    "academic",
    "actor",
    "artist",
    "author",
    "business",
    "diplomat",
    "financier",
    "government",
    "judge",
    "lawyer",
    "media",
    "model",
    "musician",
    "other public figure",
    "philanthropist",
    "politician",
    "royalty",
    "scientist",
    "socialite",
];

pub struct EpsteinGraphAdapter;

impl EpsteinGraphAdapter {
    fn out_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("epsteingraph")
    }

    fn save_json(value: &serde_json::Value, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!("[epsteingraph] failed to create {}: {}", parent.display(), e);
                return;
            }
        }
        match serde_json::to_string_pretty(value) {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    tracing::error!("[epsteingraph] failed to write {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::error!("[epsteingraph] failed to serialize {}: {}", path.display(), e),
        }
    }

    async fn api_get(
        ctx: &AdapterContext,
        rate_limit: f64,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, FetchError> {
        let mut url = format!("{}{}", API_BASE, path);
        if !query.is_empty() {
            let qs: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", k, utf8_percent_encode(v, NON_ALPHANUMERIC)))
                .collect();
            url = format!("{}?{}", url, qs.join("&"));
        }
        ctx.fetcher.fetch_json("epsteingraph", &url, rate_limit).await
    }

    async fn lookup_person(ctx: &AdapterContext, rate_limit: f64, person_name: &str) -> Option<String> {
        let data = Self::api_get(ctx, rate_limit, "/api/person-lookup", &[("q", person_name.to_string())])
            .await
            .ok()?;
        if data.get("match").and_then(|v| v.as_bool()).unwrap_or(false) {
            data.get("slug").and_then(|v| v.as_str()).map(|s| s.to_string())
        } else {
            None
        }
    }

    /// Fetch `/people/top` under a filter set and merge newly-seen slugs
    /// into `seen`, without clobbering an entry discovered by an earlier
    /// filter.
    async fn collect_top_people(
        ctx: &AdapterContext,
        rate_limit: f64,
        seen: &mut HashMap<String, serde_json::Value>,
        extra: &[(&str, String)],
    ) {
        let mut params = vec![("limit".to_string(), "200".to_string()), ("order_by".to_string(), "mentions".to_string())];
        params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.clone())));
        let params: Vec<(&str, String)> = params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();

        match Self::api_get(ctx, rate_limit, "/api/people/top", &params).await {
            Ok(data) => {
                for p in data.get("people").and_then(|v| v.as_array()).cloned().unwrap_or_default() {
                    if let Some(slug) = p.get("slug").and_then(|v| v.as_str()).map(|s| s.to_string()) {
                        seen.entry(slug).or_insert(p);
                    }
                }
            }
            Err(e) => tracing::error!("[epsteingraph] people/top failed (params={:?}): {}", extra, e),
        }
    }

    /// Collect seed slugs from every top-people filter, every graph
    /// `min_shared` level, and the redirect list; persist the combined
    /// seed list to `all_people.json` sorted by mention count.
    async fn seed_people(ctx: &AdapterContext, rate_limit: f64, out_dir: &Path) -> Vec<String> {
        let mut seen: HashMap<String, serde_json::Value> = HashMap::new();

        Self::collect_top_people(ctx, rate_limit, &mut seen, &[]).await;
        for role in KNOWN_ROLES {
            Self::collect_top_people(ctx, rate_limit, &mut seen, &[("role", role.to_string())]).await;
        }
        Self::collect_top_people(ctx, rate_limit, &mut seen, &[("public_figures", "true".to_string())]).await;

        for min_shared in [1u32, 10, 100] {
            match Self::api_get(
                ctx,
                rate_limit,
                "/api/graph",
                &[("limit", "200".to_string()), ("min_shared", min_shared.to_string())],
            )
            .await
            {
                Ok(data) => {
                    for node in data.get("nodes").and_then(|v| v.as_array()).cloned().unwrap_or_default() {
                        if let Some(slug) = node.get("slug").and_then(|v| v.as_str()).map(|s| s.to_string()) {
                            seen.entry(slug).or_insert(node);
                        }
                    }
                }
                Err(e) => tracing::error!("[epsteingraph] graph seed failed (min_shared={}): {}", min_shared, e),
            }
        }

        match Self::api_get(ctx, rate_limit, "/api/person-redirects", &[]).await {
            Ok(data) => {
                for redirect_name in data.get("redirects").and_then(|v| v.as_array()).cloned().unwrap_or_default() {
                    if let Some(redirect_name) = redirect_name.as_str() {
                        if let Some(resolved) = Self::lookup_person(ctx, rate_limit, redirect_name).await {
                            seen.entry(resolved.clone())
                                .or_insert_with(|| serde_json::json!({"slug": resolved, "name": redirect_name}));
                        }
                    }
                }
            }
            Err(e) => tracing::error!("[epsteingraph] redirect seed failed: {}", e),
        }

        let mut people: Vec<serde_json::Value> = seen.into_values().collect();
        people.sort_by(|a, b| {
            let mentions_a = a.get("mentions").and_then(|v| v.as_i64()).unwrap_or(0);
            let mentions_b = b.get("mentions").and_then(|v| v.as_i64()).unwrap_or(0);
            mentions_b.cmp(&mentions_a)
        });

        Self::save_json(
            &serde_json::json!({"total": people.len(), "people": people}),
            &out_dir.join("all_people.json"),
        );

        people
            .into_iter()
            .filter_map(|p| p.get("slug").and_then(|v| v.as_str()).map(|s| s.to_string()))
            .collect()
    }

    async fn fetch_graph(ctx: &AdapterContext, rate_limit: f64, out_dir: &Path) {
        tracing::info!("[epsteingraph] fetching connection graph...");
        for min_shared in [1u32, 10, 100, 1000] {
            match Self::api_get(
                ctx,
                rate_limit,
                "/api/graph",
                &[("limit", "200".to_string()), ("min_shared", min_shared.to_string())],
            )
            .await
            {
                Ok(data) => {
                    let nodes = data.get("nodes").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
                    let edges = data.get("edges").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
                    Self::save_json(&data, &out_dir.join("graph").join(format!("graph_min{}.json", min_shared)));
                    tracing::info!("[epsteingraph] graph min_shared={}: {} nodes, {} edges", min_shared, nodes, edges);
                }
                Err(e) => tracing::error!("[epsteingraph] graph fetch failed (min_shared={}): {}", min_shared, e),
            }
        }
    }

    async fn fetch_site_metadata(ctx: &AdapterContext, rate_limit: f64, out_dir: &Path) {
        tracing::info!("[epsteingraph] fetching site metadata...");
        for (endpoint, filename) in [
            ("/api/stats", "stats.json"),
            ("/api/trending", "trending.json"),
            ("/api/person-redirects", "person_redirects.json"),
        ] {
            match Self::api_get(ctx, rate_limit, endpoint, &[]).await {
                Ok(data) => {
                    Self::save_json(&data, &out_dir.join(filename));
                    tracing::info!("[epsteingraph] saved {}", filename);
                }
                Err(e) => tracing::error!("[epsteingraph] failed {}: {}", endpoint, e),
            }
        }
    }

    /// Fetch one person's profile, paginate their documents to
    /// completion, fetch their timeline, and register progress in the
    /// catalog. Returns the connection names found on the profile for
    /// the snowball queue.
    async fn fetch_person(
        ctx: &AdapterContext,
        rate_limit: f64,
        slug: &str,
        out_dir: &Path,
    ) -> Result<HashSet<String>, FetchError> {
        let person_dir = out_dir.join("people").join(slug);
        let mut new_names = HashSet::new();

        let data = Self::api_get(
            ctx,
            rate_limit,
            &format!("/api/people/{}", slug),
            &[
                ("limit", DOCS_PER_PAGE.to_string()),
                ("offset", "0".to_string()),
                ("sort", "doc_id".to_string()),
            ],
        )
        .await?;

        let total_docs = data.get("total_documents").and_then(|v| v.as_u64()).unwrap_or(0);
        let mut all_documents: Vec<serde_json::Value> =
            data.get("documents").and_then(|v| v.as_array()).cloned().unwrap_or_default();

        for conn in data.get("connections").and_then(|v| v.as_array()).cloned().unwrap_or_default() {
            if let Some(connected_person) = conn.get("connected_person").and_then(|v| v.as_str()) {
                new_names.insert(connected_person.to_string());
            }
        }

        // Save the profile without the (paginated) documents array so it
        // stays small; the full set goes to documents.json below.
        let mut profile = data.clone();
        if let Some(obj) = profile.as_object_mut() {
            obj.remove("documents");
        }
        Self::save_json(&profile, &person_dir.join("profile.json"));

        let mut offset = DOCS_PER_PAGE as u64;
        while offset < total_docs {
            match Self::api_get(
                ctx,
                rate_limit,
                &format!("/api/people/{}", slug),
                &[
                    ("limit", DOCS_PER_PAGE.to_string()),
                    ("offset", offset.to_string()),
                    ("sort", "doc_id".to_string()),
                ],
            )
            .await
            {
                Ok(page) => {
                    let docs = page.get("documents").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                    if docs.is_empty() {
                        break;
                    }
                    all_documents.extend(docs);
                    offset += DOCS_PER_PAGE as u64;
                }
                Err(e) => {
                    tracing::error!("[epsteingraph] docs page failed for {} at offset {}: {}", slug, offset, e);
                    break;
                }
            }
        }

        Self::save_json(
            &serde_json::json!({
                "slug": slug,
                "total_documents": total_docs,
                "fetched": all_documents.len(),
                "documents": all_documents,
            }),
            &person_dir.join("documents.json"),
        );

        tracing::info!(
            "[epsteingraph] {}: {}/{} docs, {} connections",
            slug,
            all_documents.len(),
            total_docs,
            new_names.len()
        );

        match Self::api_get(ctx, rate_limit, &format!("/api/people/{}/timeline", slug), &[]).await {
            Ok(timeline) => Self::save_json(&timeline, &person_dir.join("timeline.json")),
            Err(e) => tracing::error!("[epsteingraph] timeline failed for {}: {}", slug, e),
        }

        let api_url = format!("{}/people/{}", API_BASE, slug);
        if !ctx.documents.url_exists(&api_url).unwrap_or(false) {
            let title = data
                .get("person")
                .and_then(|p| p.get("canonical_name"))
                .and_then(|v| v.as_str())
                .unwrap_or(slug)
                .to_string();
            let meta = serde_json::json!({
                "total_documents": total_docs,
                "fetched_documents": all_documents.len(),
                "person": data.get("person").cloned().unwrap_or(serde_json::json!({})),
                "person_stats": data.get("person_stats").cloned().unwrap_or(serde_json::json!({})),
            });

            let doc = Document::new(api_url, "epsteingraph".to_string())
                .with_source_id(slug)
                .with_filename(format!("{}.json", slug))
                .with_title(title)
                .with_metadata(meta);

            if let Ok(doc_id) = ctx.documents.insert(&doc) {
                let profile_path = person_dir.join("profile.json");
                let (sha256, file_size) = std::fs::read(&profile_path)
                    .map(|bytes| (storage::compute_sha256(&bytes), bytes.len() as u64))
                    .unwrap_or_else(|_| (storage::compute_sha256(b""), 0));
                let _ = ctx.documents.update_download(
                    doc_id,
                    DownloadStatus::Downloaded,
                    Some(&profile_path.to_string_lossy()),
                    Some(&sha256),
                    Some(file_size),
                    None,
                );
            }
        }

        Ok(new_names)
    }

    fn save_state(
        ctx: &AdapterContext,
        completed: &HashSet<String>,
        failed: &HashSet<String>,
        looked_up: &HashSet<String>,
    ) {
        let state = serde_json::json!({
            "completed_slugs": completed.iter().collect::<Vec<_>>(),
            "failed_slugs": failed.iter().collect::<Vec<_>>(),
            "looked_up_names": looked_up.iter().collect::<Vec<_>>(),
        });
        let _ = ctx.source_state.save("epsteingraph", &state);
    }

    fn string_set_from_state(state: &serde_json::Value, key: &str) -> HashSet<String> {
        state
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Adapter for EpsteinGraphAdapter {
    fn name(&self) -> &'static str {
        "epsteingraph"
    }

    /// This adapter has no per-URL discovery stream — its acquisition
    /// model is the breadth-first crawl implemented in `run()`.
    fn discover<'a>(&'a self, _ctx: &'a AdapterContext) -> DiscoveryStream<'a> {
        Box::pin(stream! {
            if false {
                yield (String::new(), serde_json::Value::Null) as Discovery;
            }
        })
    }

    async fn run(&self, ctx: &AdapterContext) -> RunStats {
        let name = self.name();
        let mut stats = RunStats::default();
        let rate_limit = ctx.rate_limit_for(name);
        let out_dir = Self::out_dir(&ctx.data_dir);

        if let Err(e) = std::fs::create_dir_all(&out_dir) {
            tracing::error!("[{}] failed to create {}: {}", name, out_dir.display(), e);
            return stats;
        }

        tracing::info!("[{}] starting epsteingraph.com scrape...", name);

        let state = ctx.source_state.get(name).unwrap_or_else(|_| serde_json::json!({}));
        let mut completed_slugs = Self::string_set_from_state(&state, "completed_slugs");
        let mut failed_slugs = Self::string_set_from_state(&state, "failed_slugs");
        let mut looked_up_names = Self::string_set_from_state(&state, "looked_up_names");

        Self::fetch_site_metadata(ctx, rate_limit, &out_dir).await;

        let mut known: HashSet<String> = completed_slugs.clone();
        let mut queue: VecDeque<String> = VecDeque::new();

        let seed_slugs = Self::seed_people(ctx, rate_limit, &out_dir).await;
        for slug in &seed_slugs {
            if known.insert(slug.clone()) {
                queue.push_back(slug.clone());
                stats.discovered += 1;
            }
        }
        tracing::info!(
            "[{}] seed: {} unique people, {} already done, {} to scrape",
            name,
            seed_slugs.len(),
            completed_slugs.len(),
            queue.len()
        );

        Self::fetch_graph(ctx, rate_limit, &out_dir).await;

        let mut scraped_this_run = 0usize;
        while let Some(slug) = queue.pop_front() {
            if completed_slugs.contains(&slug) {
                continue;
            }

            tracing::info!(
                "[{}] [{}] scraping: {} (queue={}, known={})",
                name,
                scraped_this_run + 1,
                slug,
                queue.len(),
                known.len()
            );

            match Self::fetch_person(ctx, rate_limit, &slug, &out_dir).await {
                Ok(new_names) => {
                    completed_slugs.insert(slug.clone());
                    stats.downloaded += 1;
                    scraped_this_run += 1;

                    for connection_name in new_names {
                        if !looked_up_names.insert(connection_name.clone()) {
                            continue;
                        }
                        if let Some(resolved) = Self::lookup_person(ctx, rate_limit, &connection_name).await {
                            if known.insert(resolved.clone()) {
                                queue.push_back(resolved);
                                stats.discovered += 1;
                            }
                        }
                    }

                    if scraped_this_run % CHECKPOINT_EVERY == 0 {
                        Self::save_state(ctx, &completed_slugs, &failed_slugs, &looked_up_names);
                        tracing::info!(
                            "[{}] progress: {} done, {} queued, {} known",
                            name,
                            completed_slugs.len(),
                            queue.len(),
                            known.len()
                        );
                    }
                }
                Err(e) => {
                    failed_slugs.insert(slug.clone());
                    stats.failed += 1;
                    tracing::error!("[{}] failed {}: {}", name, slug, e);
                }
            }
        }

        Self::save_state(ctx, &completed_slugs, &failed_slugs, &looked_up_names);
        tracing::info!(
            "[{}] done. scraped {}, failed {}, total known {}.",
            name,
            completed_slugs.len(),
            failed_slugs.len(),
            known.len()
        );

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_roles_count_is_nineteen() {
        assert_eq!(KNOWN_ROLES.len(), 19);
    }

    #[test]
    fn test_docs_per_page() {
        assert_eq!(DOCS_PER_PAGE, 100);
    }

    #[test]
    fn test_api_base_has_no_trailing_slash() {
        assert!(!API_BASE.ends_with('/'));
    }

    #[test]
    fn test_string_set_from_state_missing_key_is_empty() {
        let state = serde_json::json!({});
        assert!(EpsteinGraphAdapter::string_set_from_state(&state, "completed_slugs").is_empty());
    }

    #[test]
    fn test_string_set_from_state_round_trip() {
        let state = serde_json::json!({"completed_slugs": ["alice", "bob"]});
        let set = EpsteinGraphAdapter::string_set_from_state(&state, "completed_slugs");
        assert_eq!(set.len(), 2);
        assert!(set.contains("alice"));
    }

    #[test]
    fn test_save_json_creates_parent_dirs_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");
        let value = serde_json::json!({"slug": "jane-doe"});
        EpsteinGraphAdapter::save_json(&value, &path);

        let read_back: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read_back, value);
    }
}
