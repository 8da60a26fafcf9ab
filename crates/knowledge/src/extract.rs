//! Source document text extraction.
//!
//! PDFs yield one page of text per PDF page, labelled `<file>_page_<i>`
//! (0-based). Everything text-like yields a single page labelled with the
//! file name.

use crate::types::{ExtractedPage, SkippedDocument};
use drugsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A document whose text can be extracted page by page.
pub trait SourceDocument: Send + Sync {
    /// Display name, used to build source labels.
    fn name(&self) -> &str;

    /// Raw text of each page, in order.
    fn pages(&self) -> AppResult<Vec<String>>;
}

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("pdf") => Self::Pdf,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") | Some("text") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Whether `knowledge learn` picks this type up when walking directories.
    pub fn is_learnable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// A document stored on disk.
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
    name: String,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self { path, name }
    }
}

impl SourceDocument for FileDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn pages(&self) -> AppResult<Vec<String>> {
        let bytes = fs::read(&self.path).map_err(|e| {
            AppError::Extraction(format!("Failed to read {:?}: {}", self.path, e))
        })?;
        pages_from_bytes(&self.name, &bytes)
    }
}

/// A document already held in memory, such as an upload buffer.
#[derive(Debug, Clone)]
pub struct InMemoryDocument {
    name: String,
    bytes: Vec<u8>,
}

impl InMemoryDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl SourceDocument for InMemoryDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn pages(&self) -> AppResult<Vec<String>> {
        pages_from_bytes(&self.name, &self.bytes)
    }
}

/// Result of extracting a batch of documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub pages: Vec<ExtractedPage>,
    pub skipped: Vec<SkippedDocument>,
}

/// Extract labelled pages from a single document.
pub fn extract_document(document: &dyn SourceDocument) -> AppResult<Vec<ExtractedPage>> {
    let name = document.name();
    let pages = document.pages()?;
    let is_pdf = pages_are_pdf(name);

    let extracted = pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| ExtractedPage {
            document: name.to_string(),
            source: if is_pdf {
                format!("{}_page_{}", name, i)
            } else {
                name.to_string()
            },
            text,
        })
        .collect();

    Ok(extracted)
}

/// Extract every document, skipping the ones that fail.
pub fn extract_documents(documents: &[Box<dyn SourceDocument>]) -> ExtractionReport {
    let mut report = ExtractionReport::default();

    for document in documents {
        match extract_document(document.as_ref()) {
            Ok(pages) => {
                tracing::debug!("Extracted {} page(s) from {}", pages.len(), document.name());
                report.pages.extend(pages);
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", document.name(), e);
                report.skipped.push(SkippedDocument {
                    name: document.name().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

fn pages_are_pdf(name: &str) -> bool {
    ContentType::from_path(Path::new(name)) == ContentType::Pdf
}

fn pages_from_bytes(name: &str, bytes: &[u8]) -> AppResult<Vec<String>> {
    if pages_are_pdf(name) {
        return pdf_pages(name, bytes);
    }

    if bytes.starts_with(b"%PDF-") {
        return Err(AppError::Extraction(format!(
            "{} looks like a PDF but is not named .pdf",
            name
        )));
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|_| AppError::Extraction(format!("{} is not valid UTF-8 text", name)))?;

    if !is_likely_text(text) {
        return Err(AppError::Extraction(format!(
            "{} looks like a binary file",
            name
        )));
    }

    Ok(vec![text.to_string()])
}

/// Extract the text of every page of a PDF.
fn pdf_pages(name: &str, bytes: &[u8]) -> AppResult<Vec<String>> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| AppError::Extraction(format!("Failed to parse PDF {}: {}", name, e)))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        let text = document.extract_text(&[*page_number]).map_err(|e| {
            AppError::Extraction(format!(
                "Failed to extract text from page {} of {}: {}",
                page_number, name, e
            ))
        })?;
        pages.push(text);
    }

    Ok(pages)
}

/// Check if text is likely UTF-8 text (not binary).
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}
