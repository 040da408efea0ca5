//! Operation history routes

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::{HistoryPage, HistoryRecord};

use super::attachment;
use crate::auth::extract::{ADMIN_ONLY, ANY_ROLE};
use crate::auth::{authorize, AuthUser};
use crate::error::ApiError;
use crate::history::csv::to_csv;
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl ListParams {
    /// Validated `(page, size)`; size is capped at `MAX_PAGE_SIZE`
    pub fn resolve(&self) -> Result<(u32, u32), ApiError> {
        let page = self.page.unwrap_or(0);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 0 {
            return Err(ApiError::BadRequest(
                "Page index must not be negative".into(),
            ));
        }
        if size <= 0 {
            return Err(ApiError::BadRequest(
                "Page size must be greater than 0".into(),
            ));
        }
        let page = u32::try_from(page)
            .map_err(|_| ApiError::BadRequest("Page index is too large".into()))?;
        Ok((page, size.min(MAX_PAGE_SIZE) as u32))
    }
}

/// GET /history
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<HistoryPage<HistoryRecord>>, ApiError> {
    authorize(&actor, ADMIN_ONLY)?;
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (page, size) = params.resolve()?;

    Ok(Json(state.history.list(page, size).await?))
}

/// GET /history/user: the caller's own operations
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    authorize(&actor, ANY_ROLE)?;
    Ok(Json(state.history.list_for_user(actor.id).await?))
}

/// GET /history/export
pub async fn export(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<Response, ApiError> {
    authorize(&actor, ADMIN_ONLY)?;
    let records = state.history.export_all().await?;
    let file_name = format!(
        "pdf_operations_history_{}.csv",
        Utc::now().format("%Y-%m-%d_%H%M%S")
    );
    tracing::info!("Exporting {} history entries", records.len());
    attachment("text/csv", &file_name, to_csv(&records).into_bytes())
}

/// DELETE /history
pub async fn delete_all(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Value>, ApiError> {
    authorize(&actor, ADMIN_ONLY)?;
    let deleted = state.history.delete_all().await?;
    tracing::info!(user_id = actor.id, "Deleted {} history entries", deleted);
    Ok(Json(json!({
        "message": "All history entries deleted successfully",
        "deleted": deleted,
    })))
}

/// DELETE /history/:id
pub async fn delete_one(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    authorize(&actor, ADMIN_ONLY)?;
    if !state.history.delete_one(id).await? {
        return Err(ApiError::NotFound(format!("History entry {} not found", id)));
    }
    tracing::info!(user_id = actor.id, history_id = id, "Deleted history entry");
    Ok(Json(json!({
        "message": "History entry deleted successfully",
        "id": id,
    })))
}
