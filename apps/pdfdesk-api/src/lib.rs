//! pdfdesk API server
//!
//! Authenticated HTTP endpoints for page-level PDF editing, with every
//! operation recorded in an audit history.

pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod history;
pub mod multipart;
pub mod orchestrator;
pub mod state;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

/// Build the full router around shared state
pub fn app(state: Arc<AppState>) -> Router {
    let max_upload = state.config.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let pdf_routes = Router::new()
        .route("/merge", post(handlers::pdf::merge))
        .route("/extract", post(handlers::pdf::extract))
        .route("/split", post(handlers::pdf::split))
        .route("/remove-page", post(handlers::pdf::remove_page))
        .route("/reorder", post(handlers::pdf::reorder))
        .route("/add-password", post(handlers::pdf::add_password))
        .route("/remove-password", post(handlers::pdf::remove_password))
        .route("/to-images", post(handlers::pdf::to_images))
        .route("/rotate", post(handlers::pdf::rotate))
        .route("/add-watermark", post(handlers::pdf::add_watermark))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(auth::handlers::register))
        .route("/auth/login", post(auth::handlers::login))
        .nest("/pdf", pdf_routes)
        .route(
            "/history",
            get(handlers::history::list).delete(handlers::history::delete_all),
        )
        .route(
            "/history/",
            get(handlers::history::list).delete(handlers::history::delete_all),
        )
        .route("/history/user", get(handlers::history::list_mine))
        .route("/history/export", get(handlers::history::export))
        .route("/history/:id", delete(handlers::history::delete_one))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
