//! Filesystem layout for downloaded document content and extracted text.
//!
//! Output is partitioned per-source so adapters never collide on paths:
//! `{data_dir}/{source}/{source_id}__{filename}` for downloaded originals,
//! `{data_dir}/extracted_text/{source}/{basename}.txt` for extractions.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Construct the destination path for a downloaded document's bytes.
///
/// When `source_id` is non-empty the on-disk name is `{source_id}__{filename}`,
/// matching the catalog's dedup key; otherwise just `filename` is used.
pub fn destination_path(data_dir: &Path, source: &str, source_id: &str, filename: &str) -> PathBuf {
    let name = if source_id.is_empty() {
        filename.to_string()
    } else {
        format!("{}__{}", source_id, filename)
    };
    data_dir.join(source).join(name)
}

/// Construct the path an extracted-text file for a document should live at.
pub fn extracted_text_path(data_dir: &Path, source: &str, basename: &str) -> PathBuf {
    data_dir.join("extracted_text").join(source).join(format!("{}.txt", basename))
}

/// Compute the SHA-256 hash of a byte slice, hex-encoded.
pub fn compute_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 hash of a file on disk, reading it in chunks so
/// large downloads (torrents) don't need to be held in memory at once.
pub fn compute_sha256_file(path: &Path) -> std::io::Result<String> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65536];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Map a MIME type to a storage file extension.
pub fn mime_to_extension(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => "pdf",
        "text/html" => "html",
        "text/plain" => "txt",
        "application/json" => "json",
        "application/xml" | "text/xml" => "xml",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/zip" => "zip",
        "application/gzip" => "gz",
        _ => "bin",
    }
}

/// Write downloaded content to its destination path, creating parent
/// directories as needed. Returns the path written to and the content hash.
pub fn save_content(
    content: &[u8],
    data_dir: &Path,
    source: &str,
    source_id: &str,
    filename: &str,
) -> std::io::Result<(PathBuf, String)> {
    let path = destination_path(data_dir, source, source_id, filename);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;

    Ok((path, compute_sha256(content)))
}

/// Write extracted text to its destination path, creating parent
/// directories as needed. Returns the path written to.
pub fn save_extracted_text(text: &str, data_dir: &Path, source: &str, basename: &str) -> std::io::Result<PathBuf> {
    let path = extracted_text_path(data_dir, source, basename);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, text)?;

    Ok(path)
}

/// Strip a filename's extension for use as an extracted-text basename.
pub fn basename_without_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_destination_path_with_source_id() {
        let data_dir = Path::new("/data");
        let path = destination_path(data_dir, "fbi_vault", "part-01", "vault.pdf");
        assert_eq!(path, PathBuf::from("/data/fbi_vault/part-01__vault.pdf"));
    }

    #[test]
    fn test_destination_path_without_source_id() {
        let data_dir = Path::new("/data");
        let path = destination_path(data_dir, "direct_urls", "", "report.pdf");
        assert_eq!(path, PathBuf::from("/data/direct_urls/report.pdf"));
    }

    #[test]
    fn test_extracted_text_path() {
        let data_dir = Path::new("/data");
        let path = extracted_text_path(data_dir, "doj", "ds1_page_001");
        assert_eq!(path, PathBuf::from("/data/extracted_text/doj/ds1_page_001.txt"));
    }

    #[test]
    fn test_mime_to_extension_known() {
        assert_eq!(mime_to_extension("application/pdf"), "pdf");
        assert_eq!(mime_to_extension("text/plain"), "txt");
    }

    #[test]
    fn test_mime_to_extension_unknown() {
        assert_eq!(mime_to_extension("application/x-made-up"), "bin");
    }

    #[test]
    fn test_save_content_writes_file_and_returns_hash() {
        let dir = tempdir().unwrap();
        let content = b"hello world";
        let (path, sha256) = save_content(content, dir.path(), "direct_urls", "", "hello.txt").unwrap();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), content);
        assert_eq!(sha256.len(), 64);
        assert_eq!(sha256, compute_sha256(content));
    }

    #[test]
    fn test_save_content_is_deterministic_by_hash() {
        let dir = tempdir().unwrap();
        let (_, hash_a) = save_content(b"same bytes", dir.path(), "direct_urls", "a", "f.txt").unwrap();
        let (_, hash_b) = save_content(b"same bytes", dir.path(), "direct_urls", "b", "f.txt").unwrap();
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn test_save_extracted_text_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = save_extracted_text("page text", dir.path(), "doj", "ds1_page_001").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "page text");
    }

    #[test]
    fn test_compute_sha256_file_matches_in_memory_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"chunked hashing test").unwrap();
        assert_eq!(compute_sha256_file(&path).unwrap(), compute_sha256(b"chunked hashing test"));
    }

    #[test]
    fn test_basename_without_extension() {
        assert_eq!(basename_without_extension("report.pdf"), "report");
        assert_eq!(basename_without_extension("archive.tar.gz"), "archive.tar");
        assert_eq!(basename_without_extension("noext"), "noext");
    }
}
