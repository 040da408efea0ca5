//! Page-level PDF editing
//!
//! Every operation parses its input, copies pages into a freshly built
//! document, and serializes the result. Inputs are never modified. Page
//! numbers are 1-based at every public function.

mod builder;
pub mod error;
pub mod merge;
pub mod output;
pub mod render;
pub mod rotate;
pub mod security;
pub mod split;
pub mod watermark;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::PdfEditError;
pub use merge::{merge, merge_documents};
pub use output::{base_name, PageImage, PdfOutput, SplitOutput};
pub use render::{effective_dpi, pdf_to_images, DEFAULT_DPI};
pub use rotate::{normalize_rotation, rotate_pages, rotation_map};
pub use security::{add_password, remove_password};
pub use split::{extract_pages, remove_page, reorder_pages, split_at_page};
pub use watermark::{add_watermark, Watermark};

use lopdf::Document;

/// Parse PDF bytes and return page count
pub fn page_count(bytes: &[u8]) -> Result<u32, PdfEditError> {
    Ok(load_any(bytes)?.get_pages().len() as u32)
}

/// Parse a comma-separated list like "3, 1, 2" keeping order and duplicates
pub fn parse_page_list(input: &str) -> Result<Vec<i64>, std::num::ParseIntError> {
    input.split(',').map(|part| part.trim().parse()).collect()
}

/// Parse a document for page editing; encrypted input is refused
pub(crate) fn load(bytes: &[u8]) -> Result<Document, PdfEditError> {
    let doc = load_any(bytes)?;
    if doc.is_encrypted() {
        return Err(PdfEditError::Encrypted);
    }
    Ok(doc)
}

pub(crate) fn load_any(bytes: &[u8]) -> Result<Document, PdfEditError> {
    if bytes.is_empty() {
        return Err(PdfEditError::ParseError("PDF file is empty".into()));
    }
    Document::load_mem(bytes).map_err(|e| PdfEditError::ParseError(e.to_string()))
}

pub(crate) fn save(mut doc: Document) -> Result<Vec<u8>, PdfEditError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfEditError::OperationError(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}
