//! PDF page-text extraction backed by `lopdf`.
//!
//! The loader walks the document's page tree in order and extracts the text of each
//! page individually, so downstream chunking can attribute chunks back to page spans.
//! Pages whose content streams yield no text are kept with an empty string; callers
//! decide whether an all-empty document is an error.

use thiserror::Error;

/// Leading bytes every well-formed PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Errors raised while loading a PDF document.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The uploaded bytes do not start with the PDF magic marker.
    #[error("uploaded file is not a PDF")]
    NotAPdf,
    /// The document is encrypted and cannot be read.
    #[error("PDF is encrypted")]
    Encrypted,
    /// The underlying parser rejected the document structure.
    #[error("failed to parse PDF document: {0}")]
    Parse(#[from] lopdf::Error),
}

/// Text extracted from a single PDF page.
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-indexed page number within the document.
    pub number: u32,
    /// Extracted text content, possibly empty for image-only pages.
    pub text: String,
}

/// Check whether the bytes look like a PDF without parsing them.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Parse a PDF from memory and extract per-page text in page order.
///
/// Individual pages whose text extraction fails are logged and kept with empty
/// text rather than failing the whole document; structural parse failures and
/// encrypted documents are hard errors.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, PdfError> {
    if !is_pdf(bytes) {
        return Err(PdfError::NotAPdf);
    }

    let document = lopdf::Document::load_mem(bytes)?;
    if document.is_encrypted() {
        return Err(PdfError::Encrypted);
    }

    let mut pages = Vec::new();
    for number in document.get_pages().keys() {
        let text = match document.extract_text(&[*number]) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(page = number, error = %error, "Failed to extract page text");
                String::new()
            }
        };
        pages.push(PageText {
            number: *number,
            text,
        });
    }

    tracing::debug!(pages = pages.len(), "Extracted PDF page text");
    Ok(pages)
}
