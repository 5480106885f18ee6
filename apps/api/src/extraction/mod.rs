//! Text extraction: best-effort plain text from PDF, DOCX or plain-text files.
//!
//! Extraction never fails from the caller's point of view: unreadable or
//! corrupt input is logged and yields an empty string. Input files are only
//! read, never modified.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// `.doc` is routed to the DOCX reader; legacy binary files then fail
    /// extraction and come back empty.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" | "doc" => DocumentFormat::Docx,
            _ => DocumentFormat::PlainText,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(DocumentFormat::PlainText)
    }
}

#[derive(Debug, Error)]
enum ExtractionFailure {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("file is not valid UTF-8")]
    Encoding,

    #[error("extractor panicked")]
    Panicked,
}

/// Extracts text from `path`, interpreting it as `format`.
pub fn extract_text(path: &Path, format: DocumentFormat) -> String {
    let result = std::fs::read(path)
        .map_err(ExtractionFailure::from)
        .and_then(|bytes| match format {
            DocumentFormat::Pdf => extract_pdf(&bytes),
            DocumentFormat::Docx => extract_docx(&bytes),
            DocumentFormat::PlainText => {
                String::from_utf8(bytes).map_err(|_| ExtractionFailure::Encoding)
            }
        });

    match result {
        Ok(text) => {
            debug!("Extracted {} chars from {}", text.len(), path.display());
            text
        }
        Err(e) => {
            warn!("Text extraction failed for {}: {e}", path.display());
            String::new()
        }
    }
}

/// Pages are concatenated in page order.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionFailure> {
    // pdf-extract panics on some malformed documents.
    catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
        .map_err(|_| ExtractionFailure::Panicked)?
        .map_err(|e| ExtractionFailure::Pdf(e.to_string()))
}

/// One line per paragraph.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionFailure> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionFailure::Docx(e.to_string()))?;
    let mut text = String::new();
    for child in docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            for paragraph_child in paragraph.children {
                if let ParagraphChild::Run(run) = paragraph_child {
                    for run_child in run.children {
                        if let RunChild::Text(t) = run_child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}
