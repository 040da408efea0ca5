//! pdfdesk API server binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use pdfdesk_api::{app, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pdfdesk_api=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Initializing pdfdesk API...");
    let config = Config::from_env()?;
    let port = config.port;
    let state = Arc::new(AppState::new(config).await?);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting pdfdesk API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
