//! PDF operation routes
//!
//! Each handler checks the caller's role, validates the form, then hands
//! the transform to an audited `Operation`. Validation failures return 400
//! without touching the engine or the history log.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::Response,
};
use pdfdesk_core::{
    base_name, effective_dpi, parse_page_list, rotation_map, PdfEditError, PdfOutput, Watermark,
};
use shared_types::OperationType;

use super::attachment;
use crate::archive::zip_entries;
use crate::auth::extract::ANY_ROLE;
use crate::auth::{authorize, AuthUser};
use crate::error::ApiError;
use crate::multipart::UploadForm;
use crate::orchestrator::{Operation, RequestMeta};
use crate::state::AppState;

const PDF: &str = "application/pdf";
const ZIP: &str = "application/zip";

fn pdf_response(output: PdfOutput) -> Result<Response, ApiError> {
    tracing::debug!("{} ({} bytes)", output.message, output.content.len());
    attachment(PDF, &output.file_name, output.content)
}

/// A 1-based page number from a form value
fn page_number(value: i64, label: &str) -> Result<u32, ApiError> {
    if value < 1 {
        return Err(ApiError::BadRequest(format!(
            "{} must be 1 or greater",
            label
        )));
    }
    // Anything past u32 is past the last page; the engine reports the count.
    Ok(u32::try_from(value).unwrap_or(u32::MAX))
}

fn page_list(input: &str, format_error: &str) -> Result<Vec<i64>, ApiError> {
    parse_page_list(input).map_err(|_| ApiError::BadRequest(format_error.to_string()))
}

/// POST /pdf/merge
pub async fn merge(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let first = form.pdf("first_pdf")?;
    let second = form.pdf("second_pdf")?;
    let output_name = form.output_name("output_name", "merged.pdf");

    let details = format!(
        "Merged files: {} and {} into {}",
        first.file_name, second.file_name, output_name
    );
    let output = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::MergePdf,
        details,
    }
    .run(move || pdfdesk_core::merge(&first.content, &second.content, &output_name))
    .await?;

    pdf_response(output)
}

/// POST /pdf/extract
pub async fn extract(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;
    let start = page_number(form.required_int("start_page")?, "Start page")?;
    let end = form.required_int("end_page")?;
    if end < i64::from(start) {
        return Err(ApiError::BadRequest(
            "End page must be greater than or equal to start page".into(),
        ));
    }
    let end = u32::try_from(end).unwrap_or(u32::MAX);
    let output_name = form.output_name("output_name", "extracted.pdf");

    let details = format!(
        "Extracted pages {}-{} from {} into {}",
        start, end, pdf.file_name, output_name
    );
    let output = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::ExtractPages,
        details,
    }
    .run(move || pdfdesk_core::extract_pages(&pdf.content, start, end, &output_name))
    .await?;

    pdf_response(output)
}

/// POST /pdf/split
pub async fn split(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;
    let split_at = page_number(form.required_int("split_at_page")?, "Split page")?;
    let first_name = form.output_name("first_output_name", "part1.pdf");
    let second_name = form.output_name("second_output_name", "part2.pdf");
    if first_name == second_name {
        return Err(ApiError::BadRequest(
            "Output names for the two parts must differ".into(),
        ));
    }

    let archive_name = format!("{}_split.zip", base_name(&pdf.file_name));
    let details = format!(
        "Split {} at page {} into {} and {}",
        pdf.file_name, split_at, first_name, second_name
    );
    let parts = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::SplitPdf,
        details,
    }
    .run(move || pdfdesk_core::split_at_page(&pdf.content, split_at, &first_name, &second_name))
    .await?;

    let [first, second] = parts.into_parts();
    let archive = zip_entries([
        (first.file_name.as_str(), first.content.as_slice()),
        (second.file_name.as_str(), second.content.as_slice()),
    ])?;
    attachment(ZIP, &archive_name, archive)
}

/// POST /pdf/remove-page
pub async fn remove_page(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;
    let page = page_number(form.required_int("page_to_remove")?, "Page number")?;
    let output_name = form.output_name("output_name", "removed_page.pdf");

    let details = format!(
        "Removed page {} from {}, output: {}",
        page, pdf.file_name, output_name
    );
    let output = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::RemovePage,
        details,
    }
    .run(move || pdfdesk_core::remove_page(&pdf.content, page, &output_name))
    .await?;

    pdf_response(output)
}

/// POST /pdf/reorder
pub async fn reorder(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;
    let page_order = form
        .text("page_order")
        .ok_or_else(|| ApiError::BadRequest("Page order list cannot be empty".into()))?
        .to_string();
    let order = page_list(
        &page_order,
        "Invalid page order format. Use comma-separated integers (e.g., '3,1,2')",
    )?;
    let output_name = form.output_name("output_name", "reordered.pdf");

    let details = format!(
        "Reordered pages in {} with order {}, output: {}",
        pdf.file_name, page_order, output_name
    );
    let output = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::ReorderPages,
        details,
    }
    .run(move || pdfdesk_core::reorder_pages(&pdf.content, &order, &output_name))
    .await?;

    pdf_response(output)
}

/// POST /pdf/add-password
pub async fn add_password(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;
    let password = form
        .raw_text("password")
        .ok_or_else(|| ApiError::BadRequest("Password cannot be empty".into()))?
        .to_string();
    let output_name = form.output_name("output_name", "protected.pdf");

    let details = format!(
        "Added password protection to {}, output: {}",
        pdf.file_name, output_name
    );
    let output = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::AddPassword,
        details,
    }
    .run(move || pdfdesk_core::add_password(&pdf.content, &password, &output_name))
    .await?;

    pdf_response(output)
}

/// POST /pdf/remove-password
pub async fn remove_password(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;
    let password = form
        .raw_text("password")
        .ok_or_else(|| ApiError::BadRequest("Password cannot be empty".into()))?
        .to_string();
    let output_name = form.output_name("output_name", "unprotected.pdf");

    let details = format!(
        "Removed password protection from {}, output: {}",
        pdf.file_name, output_name
    );
    let output = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::RemovePassword,
        details,
    }
    .run(move || pdfdesk_core::remove_password(&pdf.content, &password, &output_name))
    .await?;

    pdf_response(output)
}

/// POST /pdf/to-images
pub async fn to_images(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;
    let dpi = effective_dpi(form.int("dpi")?.unwrap_or(0));

    let archive_name = format!("{}_images.zip", base_name(&pdf.file_name));
    let details = format!("Converted {} to images with DPI={}", pdf.file_name, dpi);
    let images = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::PdfToImages,
        details,
    }
    .run(move || {
        let images = pdfdesk_core::pdf_to_images(&pdf.content, &pdf.file_name, dpi)?;
        if images.is_empty() {
            return Err(PdfEditError::RenderError("document has no pages".into()));
        }
        Ok(images)
    })
    .await?;

    let archive = zip_entries(
        images
            .iter()
            .map(|image| (image.file_name.as_str(), image.content.as_slice())),
    )?;
    attachment(ZIP, &archive_name, archive)
}

/// POST /pdf/rotate
pub async fn rotate(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;

    const FORMAT_ERROR: &str = "Invalid format. Use comma-separated integers (e.g., '1,2,3')";
    let pages = page_list(
        form.text("pages")
            .ok_or_else(|| ApiError::BadRequest("Page list cannot be empty".into()))?,
        FORMAT_ERROR,
    )?;
    let degrees = page_list(
        form.text("rotations")
            .ok_or_else(|| ApiError::BadRequest("Rotation list cannot be empty".into()))?,
        FORMAT_ERROR,
    )?;
    let rotations =
        rotation_map(&pages, &degrees).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let output_name = form.output_name("output_name", "rotated.pdf");

    let summary = pages
        .iter()
        .zip(&degrees)
        .map(|(page, deg)| format!("Page {} rotated {}°", page, deg))
        .collect::<Vec<_>>()
        .join(", ");
    let details = format!(
        "Rotated pages in {} ({}), output: {}",
        pdf.file_name, summary, output_name
    );
    let output = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::RotatePages,
        details,
    }
    .run(move || pdfdesk_core::rotate_pages(&pdf.content, &rotations, &output_name))
    .await?;

    pdf_response(output)
}

/// POST /pdf/add-watermark
pub async fn add_watermark(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    meta: RequestMeta,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    let mut form = UploadForm::parse(multipart).await?;
    let pdf = form.pdf("pdf")?;
    let text = form
        .text("watermark_text")
        .ok_or_else(|| ApiError::BadRequest("Watermark text cannot be empty".into()))?
        .to_string();

    let mut watermark = Watermark::new(text.clone());
    if let Some(size) = form.text("font_size") {
        let size: f32 = size
            .parse()
            .map_err(|_| ApiError::BadRequest("Field 'font_size' must be a number".into()))?;
        watermark = watermark
            .with_font_size(size)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }
    if let Some(color) = form.text("color") {
        watermark = watermark
            .with_color(color)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }
    let output_name = form.output_name("output_name", "watermarked.pdf");

    let details = format!(
        "Added watermark \"{}\" to {}, output: {}",
        text, pdf.file_name, output_name
    );
    let output = Operation {
        state: &state,
        actor: &actor,
        meta: &meta,
        operation_type: OperationType::AddWatermark,
        details,
    }
    .run(move || pdfdesk_core::add_watermark(&pdf.content, &watermark, &output_name))
    .await?;

    pdf_response(output)
}
