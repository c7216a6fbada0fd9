//! Catalog-spanning invariants that no single repository test can see on
//! its own: dedup across insert/update_download, the downloaded-implies-
//! hashed-and-resident contract, and resumability of per-source state
//! across process restarts (modeled here as reopening the same db file).

use std::path::Path;

use foiacquire::models::{Document, DownloadStatus, Extraction};
use foiacquire::repository::{DocumentRepository, ExtractionRepository, SourceStateRepository};
use foiacquire::storage;

fn temp_db() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("catalog.db");
    (dir, path)
}

#[test]
fn downloaded_row_always_has_hash_size_and_resident_file() {
    let (dir, db_path) = temp_db();
    let documents = DocumentRepository::new(&db_path).unwrap();

    let doc = Document::new("https://example.com/a.pdf".to_string(), "doj".to_string())
        .with_filename("a.pdf".to_string());
    let id = documents.insert(&doc).unwrap();

    let bytes = b"%PDF-1.4 fake content";
    let sha256 = storage::compute_sha256(bytes);
    let dest = dir.path().join("a.pdf");
    std::fs::write(&dest, bytes).unwrap();

    documents
        .update_download(
            id,
            DownloadStatus::Downloaded,
            Some(&dest.to_string_lossy()),
            Some(&sha256),
            Some(bytes.len() as u64),
            None,
        )
        .unwrap();

    let stored = documents.get(id).unwrap().unwrap();
    assert_eq!(stored.download_status, DownloadStatus::Downloaded);
    assert_eq!(stored.sha256.as_deref(), Some(sha256.as_str()));
    assert_eq!(stored.file_size, Some(bytes.len() as u64));
    assert!(Path::new(stored.local_path.as_deref().unwrap()).exists());
}

#[test]
fn reinserting_the_same_url_never_duplicates_a_row() {
    let (_dir, db_path) = temp_db();
    let documents = DocumentRepository::new(&db_path).unwrap();

    let doc = Document::new("https://example.com/b.pdf".to_string(), "doj".to_string());
    let first_id = documents.insert(&doc).unwrap();
    let second_id = documents.insert(&doc).unwrap();

    assert_eq!(first_id, second_id);
    assert!(documents.url_exists("https://example.com/b.pdf").unwrap());
}

#[test]
fn content_dedup_finds_the_first_downloaded_copy_by_hash() {
    let (dir, db_path) = temp_db();
    let documents = DocumentRepository::new(&db_path).unwrap();

    let first = Document::new("https://example.com/c1.pdf".to_string(), "doj".to_string());
    let first_id = documents.insert(&first).unwrap();
    let bytes = b"identical bytes";
    let sha256 = storage::compute_sha256(bytes);
    let dest = dir.path().join("c1.pdf");
    std::fs::write(&dest, bytes).unwrap();
    documents
        .update_download(first_id, DownloadStatus::Downloaded, Some(&dest.to_string_lossy()), Some(&sha256), Some(bytes.len() as u64), None)
        .unwrap();

    let second = Document::new("https://example.com/c2.pdf".to_string(), "doj".to_string());
    let second_id = documents.insert(&second).unwrap();

    let existing = documents.find_by_sha256(&sha256).unwrap();
    assert_eq!(existing.as_deref(), Some(dest.to_string_lossy().as_ref()));

    documents
        .update_download(second_id, DownloadStatus::Skipped, None, Some(&sha256), None, Some("duplicate"))
        .unwrap();
    let skipped = documents.get(second_id).unwrap().unwrap();
    assert_eq!(skipped.download_status, DownloadStatus::Skipped);
    assert!(skipped.local_path.is_none());
}

#[test]
fn a_failed_download_never_satisfies_content_dedup() {
    let (_dir, db_path) = temp_db();
    let documents = DocumentRepository::new(&db_path).unwrap();

    let doc = Document::new("https://example.com/d.pdf".to_string(), "doj".to_string());
    let id = documents.insert(&doc).unwrap();
    let sha256 = storage::compute_sha256(b"never written to disk");
    documents
        .update_download(id, DownloadStatus::Failed, None, Some(&sha256), None, Some("connection reset"))
        .unwrap();

    assert!(documents.find_by_sha256(&sha256).unwrap().is_none());
}

#[test]
fn a_document_only_needs_extraction_until_one_run_completes() {
    let (_dir, db_path) = temp_db();
    let documents = DocumentRepository::new(&db_path).unwrap();
    let extractions = ExtractionRepository::new(&db_path).unwrap();

    let doc = Document::new("https://example.com/e.pdf".to_string(), "doj".to_string())
        .with_filename("e.pdf".to_string());
    let id = documents.insert(&doc).unwrap();
    documents
        .update_download(id, DownloadStatus::Downloaded, Some("/tmp/e.pdf"), Some("deadbeef"), Some(10), None)
        .unwrap();

    let pending = documents.get_downloaded_without_extraction(Some("doj")).unwrap();
    assert_eq!(pending.len(), 1);
    assert!(!extractions.has_completed(id).unwrap());

    let extraction = Extraction::completed(id, "/tmp/e.txt".to_string(), "pdf-native".to_string(), 3, 1200, 0);
    extractions.insert(&extraction).unwrap();

    assert!(extractions.has_completed(id).unwrap());
    let pending_after = documents.get_downloaded_without_extraction(Some("doj")).unwrap();
    assert!(pending_after.is_empty());
}

#[test]
fn a_failed_extraction_keeps_the_document_eligible_for_retry() {
    let (_dir, db_path) = temp_db();
    let documents = DocumentRepository::new(&db_path).unwrap();
    let extractions = ExtractionRepository::new(&db_path).unwrap();

    let doc = Document::new("https://example.com/f.pdf".to_string(), "doj".to_string())
        .with_filename("f.pdf".to_string());
    let id = documents.insert(&doc).unwrap();
    documents
        .update_download(id, DownloadStatus::Downloaded, Some("/tmp/f.pdf"), Some("cafebabe"), Some(10), None)
        .unwrap();

    extractions.insert(&Extraction::failed(id, "pdftotext timed out".to_string())).unwrap();

    assert!(!extractions.has_completed(id).unwrap());
    let pending = documents.get_downloaded_without_extraction(None).unwrap();
    assert_eq!(pending.len(), 1);
}

#[test]
fn source_state_survives_reopening_the_same_database() {
    let (_dir, db_path) = temp_db();
    {
        let state = SourceStateRepository::new(&db_path).unwrap();
        state
            .save("epsteingraph", &serde_json::json!({"completed_slugs": ["alice", "bob"]}))
            .unwrap();
    }

    // Reopening models a resumed process picking the crawl back up.
    let reopened = SourceStateRepository::new(&db_path).unwrap();
    let loaded = reopened.get("epsteingraph").unwrap();
    assert_eq!(loaded["completed_slugs"].as_array().unwrap().len(), 2);
}

#[test]
fn source_state_for_an_unseen_source_is_an_empty_object() {
    let (_dir, db_path) = temp_db();
    let state = SourceStateRepository::new(&db_path).unwrap();
    let loaded = state.get("never_run_before").unwrap();
    assert_eq!(loaded, serde_json::json!({}));
}

#[test]
fn per_source_per_status_stats_add_up_to_every_row() {
    let (_dir, db_path) = temp_db();
    let documents = DocumentRepository::new(&db_path).unwrap();

    for (url, status) in [
        ("https://example.com/g1.pdf", DownloadStatus::Downloaded),
        ("https://example.com/g2.pdf", DownloadStatus::Failed),
        ("https://example.com/g3.pdf", DownloadStatus::Pending),
    ] {
        let doc = Document::new(url.to_string(), "doj".to_string());
        let id = documents.insert(&doc).unwrap();
        if status != DownloadStatus::Pending {
            documents.update_download(id, status, None, None, Some(100), None).unwrap();
        }
    }

    let stats = documents.get_stats().unwrap();
    let total: i64 = stats.iter().map(|s| s.count).sum();
    assert_eq!(total, 3);
    assert!(stats.iter().any(|s| s.download_status == "downloaded" && s.count == 1));
}
