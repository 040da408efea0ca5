//! Page rasterization with MuPDF

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use mupdf::{Colorspace, Matrix, Pixmap};

use crate::error::PdfEditError;
use crate::output::{base_name, PageImage};

/// Resolution used when the caller asks for zero or a negative DPI
pub const DEFAULT_DPI: u32 = 150;

/// PDF user space is 72 units per inch
const POINTS_PER_INCH: f32 = 72.0;

impl From<mupdf::Error> for PdfEditError {
    fn from(err: mupdf::Error) -> Self {
        PdfEditError::RenderError(err.to_string())
    }
}

/// Map a requested DPI onto a usable one
pub fn effective_dpi(requested: i64) -> u32 {
    if requested <= 0 {
        DEFAULT_DPI
    } else {
        u32::try_from(requested).unwrap_or(u32::MAX)
    }
}

/// Render each page to PNG, named `<base>_page_<n>.png` with 1-based `n`
pub fn pdf_to_images(
    bytes: &[u8],
    pdf_name: &str,
    dpi: u32,
) -> Result<Vec<PageImage>, PdfEditError> {
    if bytes.is_empty() {
        return Err(PdfEditError::ParseError("PDF file is empty".into()));
    }
    let dpi = if dpi == 0 { DEFAULT_DPI } else { dpi };

    let document = mupdf::Document::from_bytes(bytes, "application/pdf")
        .map_err(|e| PdfEditError::ParseError(e.to_string()))?;
    if document.needs_password()? {
        return Err(PdfEditError::Encrypted);
    }
    let page_count = document.page_count()?;

    let scale = dpi as f32 / POINTS_PER_INCH;
    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    let base = base_name(pdf_name);

    let mut images = Vec::with_capacity(page_count.max(0) as usize);
    for index in 0..page_count {
        let page = document.load_page(index)?;
        let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;
        images.push(PageImage {
            file_name: format!("{}_page_{}.png", base, index + 1),
            content: encode_png(&pixmap)?,
        });
    }

    tracing::debug!(pages = images.len(), dpi, "Rendered PDF pages");
    Ok(images)
}

fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, PdfEditError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let n = pixmap.n() as usize;
    let samples = pixmap.samples();

    let image = match n {
        3 => RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgba8),
        _ => None,
    }
    .ok_or_else(|| {
        PdfEditError::RenderError(format!(
            "Unexpected pixmap layout: {}x{} with {} components",
            width, height, n
        ))
    })?;

    let mut output = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| PdfEditError::RenderError(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;
    use pretty_assertions::assert_eq;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn test_effective_dpi() {
        assert_eq!(effective_dpi(0), 150);
        assert_eq!(effective_dpi(-20), 150);
        assert_eq!(effective_dpi(72), 72);
    }

    #[test]
    fn test_renders_each_page_as_png() {
        let pdf = create_test_pdf(2, "Img");
        let images = pdf_to_images(&pdf, "scan.pdf", 36).unwrap();

        let names: Vec<&str> = images.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["scan_page_1.png", "scan_page_2.png"]);
        for image in &images {
            assert!(image.content.starts_with(PNG_MAGIC));
        }
    }

    #[test]
    fn test_resolution_scales_output() {
        let pdf = create_test_pdf(1, "Img");
        let small = pdf_to_images(&pdf, "a.pdf", 36).unwrap();
        let decoded = image::load_from_memory(&small[0].content).unwrap();
        // 612 x 792 pt at half of 72 DPI
        assert_eq!((decoded.width(), decoded.height()), (306, 396));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(pdf_to_images(&[], "a.pdf", 150).is_err());
        assert!(pdf_to_images(b"not a pdf", "a.pdf", 150).is_err());
    }

    #[test]
    fn test_protected_input_fails() {
        let protected = crate::add_password(&create_test_pdf(1, "Img"), "pw", "p.pdf")
            .unwrap()
            .content;
        assert!(matches!(
            pdf_to_images(&protected, "p.pdf", 72),
            Err(PdfEditError::Encrypted)
        ));
    }
}
