//! HTTP adapter over the catalog.
//!
//! [`router`] wires the route handlers to shared [`AppState`]; [`serve`]
//! binds it and runs until ctrl-c.

pub mod error;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::catalog::projection::PreviewGenerator;
use crate::catalog::search::{LinearScan, SimilarityIndex};
use crate::catalog::store::EmbeddingStore;
use crate::catalog::types::ImageRecord;
use crate::config::ClipdexConfig;
use crate::embedding::EmbeddingProvider;

/// Largest request body accepted, to fit multi-image uploads.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared state handed to every handler.
pub struct AppState {
    pub store: Arc<EmbeddingStore>,
    pub index: Arc<dyn SimilarityIndex>,
    pub embedding: Arc<dyn EmbeddingProvider>,
    pub previews: Arc<dyn PreviewGenerator>,
    pub upload_dir: PathBuf,
    pub config: Arc<ClipdexConfig>,
}

impl AppState {
    /// State with the default strategies: linear-scan search and URL previews.
    pub fn new(
        store: Arc<EmbeddingStore>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: Arc<ClipdexConfig>,
    ) -> Self {
        Self {
            index: Arc::new(LinearScan::new(Arc::clone(&store))),
            store,
            embedding,
            previews: Arc::new(UrlPreview),
            upload_dir: config.resolved_upload_dir(),
            config,
        }
    }
}

/// Previews as the URL the image is served from (`/image/<file name>`).
#[derive(Debug, Clone, Copy)]
pub struct UrlPreview;

impl PreviewGenerator for UrlPreview {
    fn preview(&self, record: &ImageRecord) -> String {
        let name = routes::basename(&record.path).unwrap_or_else(|| record.id.to_string());
        format!("/image/{name}")
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upload", post(routes::upload))
        .route("/search_by_image", post(routes::search_by_image))
        .route("/search", post(routes::search_by_text))
        .route("/all_images", get(routes::all_images))
        .route("/image/{filename}", get(routes::serve_image))
        .route("/delete_all", post(routes::delete_all))
        .route("/image_points", get(routes::image_points))
        .route("/paginated_images", get(routes::paginated_images))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Serve the HTTP API until ctrl-c.
pub async fn serve(
    config: ClipdexConfig,
    store: Arc<EmbeddingStore>,
    embedding: Arc<dyn EmbeddingProvider>,
) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(store, embedding, Arc::new(config)));
    tokio::fs::create_dir_all(&state.upload_dir).await?;
    tracing::info!(uploads = %state.upload_dir.display(), "upload directory ready");

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "clipdex listening at http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_preview_uses_file_name() {
        let record = ImageRecord {
            id: 7,
            path: "/srv/uploads/dog.png".into(),
            embedding: vec![],
            created_at: None,
        };
        assert_eq!(UrlPreview.preview(&record), "/image/dog.png");
    }
}
