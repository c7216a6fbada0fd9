//! Text extraction from PDFs using pdftotext, with per-page Tesseract OCR
//! fallback for pages with too little native text.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use thiserror::Error;

use crate::models::{Document, Extraction};
use crate::repository::ExtractionRepository;
use crate::storage;

const PAGE_MARKER_PREFIX: &str = "--- Page ";
const PAGE_MARKER_SUFFIX: &str = " ---";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("external tool not found: {0}")]
    ToolNotFound(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("extraction timed out running {0}")]
    Timeout(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse pdf: {0}")]
    PdfParse(String),
}

fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let truncated: String = stderr.chars().take(500).collect();
                Err(ExtractionError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix, truncated
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

fn check_cmd_status(
    result: std::io::Result<std::process::ExitStatus>,
    tool_name: &str,
    error_msg: &str,
) -> Result<(), ExtractionError> {
    match result {
        Ok(s) if s.success() => Ok(()),
        Ok(_) => Err(ExtractionError::ExtractionFailed(error_msg.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

fn non_whitespace_chars(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

/// Result of extracting text from a document.
#[derive(Debug)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub page_count: u32,
    pub ocr_pages: u32,
    pub char_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Every page came from pdftotext.
    PdfToText,
    /// At least one page was OCR'd.
    Hybrid,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfToText => "pdf-native",
            Self::Hybrid => "pdf-native+ocr",
        }
    }
}

/// Text extractor backed by poppler-utils (`pdftotext`/`pdftoppm`/`pdfinfo`)
/// and Tesseract.
pub struct TextExtractor {
    min_chars_per_page: usize,
    tesseract_lang: String,
    max_ocr_pages: u32,
    ocr_dpi: u32,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self {
            min_chars_per_page: 50,
            tesseract_lang: "eng".to_string(),
            max_ocr_pages: 50,
            ocr_dpi: 300,
        }
    }
}

impl TextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars_per_page = min_chars;
        self
    }

    pub fn with_language(mut self, lang: &str) -> Self {
        self.tesseract_lang = lang.to_string();
        self
    }

    pub fn with_max_ocr_pages(mut self, max_ocr_pages: u32) -> Self {
        self.max_ocr_pages = max_ocr_pages;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.ocr_dpi = dpi;
        self
    }

    /// Extract text from a file based on its MIME type.
    pub fn extract(&self, file_path: &Path, mime_type: &str) -> Result<ExtractionResult, ExtractionError> {
        match mime_type {
            "application/pdf" => self.extract_pdf(file_path),
            "text/plain" | "text/html" => {
                let text = std::fs::read_to_string(file_path)?;
                let char_count = text.chars().count();
                Ok(ExtractionResult {
                    text,
                    method: ExtractionMethod::PdfToText,
                    page_count: 1,
                    ocr_pages: 0,
                    char_count,
                })
            }
            _ => Err(ExtractionError::UnsupportedFileType(mime_type.to_string())),
        }
    }

    /// Extract text from a PDF, page by page. A page is OCR'd only when
    /// its native text falls under `min_chars_per_page` and the OCR page
    /// budget (`max_ocr_pages`) has not been spent; OCR text replaces the
    /// native text for a page only when it is strictly longer.
    fn extract_pdf(&self, file_path: &Path) -> Result<ExtractionResult, ExtractionError> {
        // An unreadable `pdfinfo` result (unparsable, encrypted) or a
        // zero-page document is a whole-document failure, not a reason to
        // fall back to a synthetic single page.
        let page_count = self.get_pdf_page_count(file_path).ok_or_else(|| {
            ExtractionError::PdfParse(format!("pdfinfo could not read {}", file_path.display()))
        })?;
        if page_count == 0 {
            return Err(ExtractionError::PdfParse(format!(
                "{} has zero pages",
                file_path.display()
            )));
        }
        let ocr_available = which::which("pdftoppm").is_ok() && which::which("tesseract").is_ok();

        let temp_dir = if ocr_available {
            Some(TempDir::new()?)
        } else {
            None
        };

        let mut page_texts: Vec<String> = Vec::with_capacity(page_count as usize);
        let mut ocr_pages_used = 0u32;

        for page_num in 1..=page_count {
            let native_text = self.extract_pdf_page_text(file_path, page_num).unwrap_or_default();

            let needs_ocr = non_whitespace_chars(&native_text) < self.min_chars_per_page;
            let mut final_text = native_text.clone();

            if needs_ocr && ocr_pages_used < self.max_ocr_pages {
                if let Some(ref temp_dir) = temp_dir {
                    match self.ocr_pdf_page(file_path, page_num, temp_dir.path()) {
                        Ok(ocr_text) => {
                            if ocr_text.len() > native_text.len() {
                                final_text = ocr_text;
                                ocr_pages_used += 1;
                            }
                        }
                        Err(e) => {
                            tracing::debug!("ocr failed for page {}: {}", page_num, e);
                        }
                    }
                }
            }

            page_texts.push(final_text);
        }

        if ocr_pages_used >= self.max_ocr_pages && page_count > self.max_ocr_pages {
            tracing::warn!(
                "hit OCR page budget ({}) extracting {}",
                self.max_ocr_pages,
                file_path.display()
            );
        }

        let combined_text = join_pages(&page_texts);
        let char_count = combined_text.chars().count();
        let method = if ocr_pages_used > 0 {
            ExtractionMethod::Hybrid
        } else {
            ExtractionMethod::PdfToText
        };

        Ok(ExtractionResult {
            text: combined_text,
            method,
            page_count,
            ocr_pages: ocr_pages_used,
            char_count,
        })
    }

    fn run_pdftotext(&self, file_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(file_path)
            .arg("-")
            .output();

        handle_cmd_output(output, "pdftotext (install poppler-utils)", "pdftotext failed")
    }

    fn extract_pdf_page_text(&self, file_path: &Path, page: u32) -> Result<String, ExtractionError> {
        let page_str = page.to_string();
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(file_path)
            .arg("-")
            .output();

        handle_cmd_output(
            output,
            "pdftotext (install poppler-utils)",
            &format!("pdftotext failed on page {}", page),
        )
    }

    pub fn get_pdf_page_count(&self, file_path: &Path) -> Option<u32> {
        let output = Command::new("pdfinfo").arg(file_path).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            if let Some(rest) = line.strip_prefix("Pages:") {
                return rest.trim().parse().ok();
            }
        }
        None
    }

    fn ocr_pdf_page(
        &self,
        file_path: &Path,
        page: u32,
        temp_path: &Path,
    ) -> Result<String, ExtractionError> {
        let page_str = page.to_string();
        let dpi_str = self.ocr_dpi.to_string();
        let output_prefix = temp_path.join(format!("page-{}", page));

        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(file_path)
            .arg(&output_prefix)
            .status();

        check_cmd_status(
            status,
            "pdftoppm (install poppler-utils)",
            &format!("pdftoppm failed to convert page {}", page),
        )?;

        let image_path = Self::find_rendered_page(temp_path, page)?;
        self.run_tesseract(&image_path)
    }

    fn find_rendered_page(temp_path: &Path, page: u32) -> Result<std::path::PathBuf, ExtractionError> {
        for digits in [1, 2, 3, 4] {
            let candidate = temp_path.join(format!("page-{}-{:0width$}.png", page, 1, width = digits));
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        // pdftoppm with -f/-l on a single page names the file without a
        // page-number suffix when the range covers exactly one page.
        let bare = temp_path.join(format!("page-{}.png", page));
        if bare.exists() {
            return Ok(bare);
        }
        let mut entries: Vec<_> = std::fs::read_dir(temp_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
            .collect();
        entries.sort();
        entries
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::ExtractionFailed(format!("no image rendered for page {}", page)))
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.tesseract_lang])
            .output();

        handle_cmd_output(output, "tesseract (install tesseract-ocr)", "tesseract failed")
    }

    /// Check which external tools are available, for startup diagnostics.
    pub fn check_tools() -> Vec<(&'static str, bool)> {
        ["pdftotext", "pdftoppm", "pdfinfo", "tesseract"]
            .iter()
            .map(|tool| (*tool, which::which(tool).is_ok()))
            .collect()
    }
}

/// Run extraction against a downloaded document's local file and record
/// the outcome in the extraction catalog. Shared by the adapter run loop
/// (after a fresh download) and the extract-only orchestrator pass (over
/// already-downloaded documents). Extraction failures are recorded as a
/// failed extraction row rather than propagated, matching the catalog's
/// invariant that extraction failures never fail the download.
pub fn extract_and_record(
    extractor: &TextExtractor,
    ext_repo: &ExtractionRepository,
    document: &Document,
    data_dir: &Path,
) -> Result<Extraction, ExtractionError> {
    let local_path = document
        .local_path
        .as_ref()
        .ok_or_else(|| ExtractionError::ExtractionFailed("document has no local_path".to_string()))?;

    let outcome = extractor.extract(Path::new(local_path), "application/pdf");

    let extraction = match outcome {
        Ok(result) => {
            let basename = storage::basename_without_extension(&document.filename);
            let output_path = storage::save_extracted_text(&result.text, data_dir, &document.source, basename)
                .map_err(ExtractionError::Io)?;
            Extraction::completed(
                document.id,
                output_path.to_string_lossy().into_owned(),
                result.method.as_str().to_string(),
                result.page_count,
                result.char_count,
                result.ocr_pages,
            )
        }
        Err(e) => Extraction::failed(document.id, e.to_string()),
    };

    ext_repo
        .insert(&extraction)
        .map_err(|e| ExtractionError::ExtractionFailed(e.to_string()))?;

    Ok(extraction)
}

/// Join per-page text with the catalog's public `--- Page N ---` marker
/// format. This format is a contract consumed by downstream indexing
/// tools; page numbers are 1-based.
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}{}{}\n{}", PAGE_MARKER_PREFIX, i + 1, PAGE_MARKER_SUFFIX, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages_format() {
        let pages = vec!["first page text".to_string(), "second page text".to_string()];
        let joined = join_pages(&pages);
        assert!(joined.contains("--- Page 1 ---\nfirst page text"));
        assert!(joined.contains("--- Page 2 ---\nsecond page text"));
    }

    #[test]
    fn test_page_marker_regex_matches_joined_output() {
        let pages = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let joined = join_pages(&pages);
        let re = regex::Regex::new(r"---\s*Page\s+(\d+)\s*---").unwrap();
        let numbers: Vec<u32> = re
            .captures_iter(&joined)
            .map(|c| c[1].parse().unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_non_whitespace_chars_ignores_newlines_and_spaces() {
        assert_eq!(non_whitespace_chars("a b\nc"), 3);
        assert_eq!(non_whitespace_chars("   \n\t "), 0);
    }

    #[test]
    fn test_check_tools_returns_all_four() {
        let tools = TextExtractor::check_tools();
        assert_eq!(tools.len(), 4);
    }

    #[test]
    fn test_extract_plain_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "hello world").unwrap();

        let extractor = TextExtractor::new();
        let result = extractor.extract(&path, "text/plain").unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.page_count, 1);
    }

    #[test]
    fn test_extract_pdf_with_garbage_bytes_surfaces_pdf_parse_error() {
        // Not a real PDF: pdfinfo can't read it, so this must fail the
        // whole-document extraction rather than silently reporting one
        // empty page (spec: unparsable/encrypted/zero-page PDFs are a
        // document-level extraction error, never a synthetic success).
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-pdf.pdf");
        std::fs::write(&path, b"this is not a pdf file").unwrap();

        let extractor = TextExtractor::new();
        let err = extractor.extract(&path, "application/pdf").unwrap_err();
        assert!(matches!(err, ExtractionError::PdfParse(_)));
    }

    #[test]
    fn test_extract_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.bin");
        std::fs::write(&path, b"\x00\x01").unwrap();

        let extractor = TextExtractor::new();
        let err = extractor.extract(&path, "application/octet-stream").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFileType(_)));
    }
}
