//! Error types for the PDF API

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pdfdesk_core::PdfEditError;
use serde_json::json;
use thiserror::Error;

use crate::history::HistoryError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Transform(#[from] PdfEditError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Transform(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Transform(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::History(HistoryError::InvalidPage(_)) => StatusCode::BAD_REQUEST,
            ApiError::History(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::History(e @ HistoryError::InvalidPage(_)) => e.to_string(),
            ApiError::History(e) => {
                tracing::error!("History store error: {}", e);
                "Database error".to_string()
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal error".to_string()
            }
            ApiError::Transform(e) => {
                tracing::warn!("PDF operation failed: {}", e);
                e.to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}
