//! Grapnel HTTP server wiring.
//!
//! Builds the production collaborator set (yt-dlp catalog, HTTP fetcher,
//! ffmpeg muxer), assembles the router, and serves it.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use grapnel_core::GrapnelConfig;
use grapnel_core::catalog::YtDlpCatalog;
use grapnel_core::download::{DownloadService, FfmpegMuxer, Muxer};
use grapnel_core::fetch::HttpStreamFetcher;
use tower_http::cors::CorsLayer;

use crate::handlers::{download, health, metadata};

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub download: Arc<DownloadService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(download: DownloadService) -> Self {
        Self {
            download: Arc::new(download),
            started_at: Instant::now(),
        }
    }
}

/// Assembles the API router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/download", post(download))
        .route("/metadata", post(metadata))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Builds the production service and serves it until shutdown.
pub async fn run_server(config: GrapnelConfig) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Arc::new(YtDlpCatalog::new(&config.catalog));
    if !catalog.is_available() {
        tracing::warn!("yt-dlp binary not found; metadata lookups will fail");
    }

    let muxer = Arc::new(FfmpegMuxer::new(&config.remux));
    if !muxer.is_available() {
        tracing::warn!("ffmpeg binary not found; combine downloads will fail");
    }

    let fetcher = Arc::new(HttpStreamFetcher::new(&config.fetch)?);

    let bind_address = config.server.bind_address.clone();
    let service = DownloadService::new(catalog, fetcher, muxer, config);
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Grapnel server running on http://{bind_address}");
    axum::serve(listener, app).await?;
    Ok(())
}
