//! HTTP handlers

pub mod history;
pub mod pdf;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "pdfdesk-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// A download response with `Content-Disposition: attachment`
pub fn attachment(
    content_type: &'static str,
    file_name: &str,
    body: Vec<u8>,
) -> Result<Response, ApiError> {
    let disposition = format!("attachment; filename=\"{}\"", header_safe(file_name));
    let disposition = HeaderValue::from_bytes(disposition.as_bytes())
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Drop characters that would break a quoted header parameter
fn header_safe(file_name: &str) -> String {
    file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect()
}
