//! PDF Merge algorithm
//!
//! Combines PDFs into a single document, pages in input order.

use crate::builder::PageCopier;
use crate::error::PdfEditError;
use crate::output::PdfOutput;

/// Merge two PDFs: all pages of `first`, then all pages of `second`
pub fn merge(first: &[u8], second: &[u8], output_name: &str) -> Result<PdfOutput, PdfEditError> {
    let content = merge_documents(&[first, second])?;
    Ok(PdfOutput::new(
        output_name,
        "PDF files merged successfully",
        content,
    ))
}

/// Merge any number of PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Create a new destination document
/// 3. For each source document:
///    a. Import all objects with ids offset past the destination's
///    b. Append its pages to the destination page tree
/// 4. Prune, compress and return the merged result
pub fn merge_documents(documents: &[&[u8]]) -> Result<Vec<u8>, PdfEditError> {
    if documents.is_empty() {
        return Err(PdfEditError::OperationError("No documents to merge".into()));
    }

    let mut copier = PageCopier::new();
    for (i, bytes) in documents.iter().enumerate() {
        let source = crate::load(bytes).map_err(|e| {
            PdfEditError::ParseError(format!("Failed to load document {}: {}", i + 1, e))
        })?;
        let imported = copier.import(&source);
        copier.append_all(&imported)?;
    }

    crate::save(copier.finish())
}
