//! Additive page rotation

use std::collections::BTreeMap;

use lopdf::Object;

use crate::error::PdfEditError;
use crate::output::PdfOutput;

/// Add `delta` (floored to a multiple of 90) to `current`, normalized to 0..360
pub fn normalize_rotation(current: i64, delta: i64) -> i64 {
    let quarters = delta.div_euclid(90).rem_euclid(4);
    (current.rem_euclid(360) + quarters * 90).rem_euclid(360)
}

/// Pair page numbers with rotations positionally; a repeated page keeps its last rotation
pub fn rotation_map(pages: &[i64], degrees: &[i64]) -> Result<BTreeMap<i64, i64>, PdfEditError> {
    if pages.len() != degrees.len() {
        return Err(PdfEditError::InvalidInput(
            "Number of pages and rotations must match".into(),
        ));
    }
    Ok(pages.iter().copied().zip(degrees.iter().copied()).collect())
}

/// Rotate pages by the given amounts on top of their current rotation.
///
/// Every page key is checked before anything is copied.
pub fn rotate_pages(
    bytes: &[u8],
    rotations: &BTreeMap<i64, i64>,
    output_name: &str,
) -> Result<PdfOutput, PdfEditError> {
    let source = crate::load(bytes)?;
    let total = source.get_pages().len() as i64;

    if let Some(bad) = rotations.keys().find(|&&p| p < 1 || p > total) {
        return Err(PdfEditError::InvalidRange(format!(
            "Invalid page number {}. Document has {} pages.",
            bad, total
        )));
    }

    let mut doc = crate::builder::copy_document(&source)?;
    let pages = doc.get_pages();
    for (&page, &delta) in rotations {
        let page_id = pages.get(&(page as u32)).copied().ok_or_else(|| {
            PdfEditError::OperationError(format!("Page {} missing from output", page))
        })?;
        let dict = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
        let current = dict.get(b"Rotate").and_then(Object::as_i64).unwrap_or(0);
        dict.set("Rotate", Object::Integer(normalize_rotation(current, delta)));
    }

    let content = crate::save(doc)?;
    Ok(PdfOutput::new(
        output_name,
        "PDF pages rotated successfully",
        content,
    ))
}
