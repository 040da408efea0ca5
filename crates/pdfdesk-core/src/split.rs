//! Page selection operations: extract, split, remove and reorder
//!
//! Each one validates page numbers against the parsed document, then copies
//! the selected pages (0-based internally) into new output documents.

use lopdf::Document;

use crate::builder::PageCopier;
use crate::error::PdfEditError;
use crate::output::{PdfOutput, SplitOutput};

/// Copy pages at the given 0-based indices, in order, into a new PDF
fn copy_pages(
    source: &Document,
    indices: impl IntoIterator<Item = usize>,
) -> Result<Vec<u8>, PdfEditError> {
    let mut copier = PageCopier::new();
    let imported = copier.import(source);
    for index in indices {
        copier.append_page(&imported, index)?;
    }
    crate::save(copier.finish())
}

/// Extract pages `start..=end`; `end` is clamped to the page count
pub fn extract_pages(
    bytes: &[u8],
    start: u32,
    end: u32,
    output_name: &str,
) -> Result<PdfOutput, PdfEditError> {
    if start < 1 {
        return Err(PdfEditError::InvalidRange(
            "Start page must be 1 or greater".into(),
        ));
    }
    if end < start {
        return Err(PdfEditError::InvalidRange(
            "End page must be greater than or equal to start page".into(),
        ));
    }

    let source = crate::load(bytes)?;
    let total = source.get_pages().len() as u32;
    if start > total {
        return Err(PdfEditError::InvalidRange(format!(
            "Start page {} exceeds the number of pages in the document ({})",
            start, total
        )));
    }

    let end = end.min(total);
    let content = copy_pages(&source, (start - 1) as usize..end as usize)?;
    Ok(PdfOutput::new(
        output_name,
        format!("Pages {} to {} extracted successfully", start, end),
        content,
    ))
}

/// Split into pages `1..=k` and `k+1..=count`
pub fn split_at_page(
    bytes: &[u8],
    split_at: u32,
    first_name: &str,
    second_name: &str,
) -> Result<SplitOutput, PdfEditError> {
    if split_at < 1 {
        return Err(PdfEditError::InvalidRange(
            "Split page must be 1 or greater".into(),
        ));
    }

    let source = crate::load(bytes)?;
    let total = source.get_pages().len() as u32;
    if split_at > total {
        return Err(PdfEditError::InvalidRange(format!(
            "Split page {} exceeds the number of pages in the document ({})",
            split_at, total
        )));
    }

    let first = copy_pages(&source, 0..split_at as usize)?;
    let second = copy_pages(&source, split_at as usize..total as usize)?;

    Ok(SplitOutput {
        first: PdfOutput::new(first_name, "First part of split PDF", first),
        second: PdfOutput::new(second_name, "Second part of split PDF", second),
    })
}

/// Copy every page except `page`
pub fn remove_page(bytes: &[u8], page: u32, output_name: &str) -> Result<PdfOutput, PdfEditError> {
    if page < 1 {
        return Err(PdfEditError::InvalidRange(
            "Page number must be 1 or greater".into(),
        ));
    }

    let source = crate::load(bytes)?;
    let total = source.get_pages().len() as u32;
    if page > total {
        return Err(PdfEditError::InvalidRange(format!(
            "Page {} exceeds the number of pages in the document ({})",
            page, total
        )));
    }

    let removed = (page - 1) as usize;
    let content = copy_pages(&source, (0..total as usize).filter(|&i| i != removed))?;
    Ok(PdfOutput::new(
        output_name,
        format!("Page {} removed successfully", page),
        content,
    ))
}

/// Output page i is input page `order[i]`; duplicates and omissions are allowed
pub fn reorder_pages(
    bytes: &[u8],
    order: &[i64],
    output_name: &str,
) -> Result<PdfOutput, PdfEditError> {
    let source = crate::load(bytes)?;
    let total = source.get_pages().len() as i64;

    if let Some(bad) = order.iter().find(|&&p| p < 1 || p > total) {
        return Err(PdfEditError::InvalidRange(format!(
            "Invalid page number {} in page order. Document has {} pages.",
            bad, total
        )));
    }

    let content = copy_pages(&source, order.iter().map(|&p| (p - 1) as usize))?;
    Ok(PdfOutput::new(
        output_name,
        "PDF pages reordered successfully",
        content,
    ))
}
