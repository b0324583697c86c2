//! HTTP route handlers.
//!
//! Handlers are thin: they parse the request, move blocking work (embedding,
//! SQLite, scoring, PCA) onto tokio's blocking pool, and shape the response.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::catalog::types::SearchHit;
use crate::catalog::{pagination, projection};
use crate::error::Error;

#[derive(Deserialize)]
pub struct TextSearchRequest {
    pub query: Option<String>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResultResponse {
    pub path: String,
    /// Cosine similarity scaled to percent.
    pub similarity: f32,
}

#[derive(Serialize)]
pub struct ImagePointResponse {
    pub id: i64,
    #[serde(rename = "imageData")]
    pub image_data: String,
    pub position: [f32; 3],
}

#[derive(Serialize)]
pub struct PageResponse {
    pub images: Vec<String>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}

/// Run blocking work on the blocking pool.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Final path component of `name`, or `None` if it has none (empty, `..`, `/`).
pub fn basename(name: &str) -> Option<String> {
    FsPath::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Save an uploaded file under the upload directory and return its path.
async fn save_upload(
    state: &AppState,
    file_name: Option<&str>,
    data: &Bytes,
) -> ApiResult<PathBuf> {
    let name = file_name
        .and_then(basename)
        .ok_or_else(|| ApiError::bad_request("No selected file"))?;
    tokio::fs::create_dir_all(&state.upload_dir).await?;
    let path = state.upload_dir.join(name);
    tokio::fs::write(&path, data).await?;
    Ok(path)
}

/// Remove a saved upload that never made it into the store.
async fn discard_upload(path: &FsPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove orphaned upload");
    }
}

fn to_results(hits: Vec<SearchHit>) -> Vec<SearchResultResponse> {
    hits.into_iter()
        .map(|hit| SearchResultResponse {
            path: basename(&hit.path).unwrap_or(hit.path),
            similarity: hit.score * 100.0,
        })
        .collect()
}

/// Store and index every file in the `images` field.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut stored = 0usize;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("images") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        let path = save_upload(&state, file_name.as_deref(), &data).await?;

        let embedding = Arc::clone(&state.embedding);
        let store = Arc::clone(&state.store);
        let path_str = path.to_string_lossy().into_owned();
        let stored_id = blocking(move || {
            let vector = embedding.embed_image(&data)?;
            Ok(store.insert(&path_str, &vector)?)
        })
        .await;
        let id = match stored_id {
            Ok(id) => id,
            Err(e) => {
                discard_upload(&path).await;
                return Err(e);
            }
        };

        tracing::info!(id, path = %path.display(), "image uploaded");
        stored += 1;
    }

    if stored == 0 {
        return Err(ApiError::bad_request("No selected file"));
    }
    Ok(Json(json!({ "message": "Files uploaded successfully" })))
}

/// Rank stored images against an uploaded query image.
pub async fn search_by_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Vec<SearchResultResponse>>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        save_upload(&state, file_name.as_deref(), &data).await?;

        let embedding = Arc::clone(&state.embedding);
        let index = Arc::clone(&state.index);
        let k = state.config.search.default_k;
        let hits = blocking(move || {
            let query = embedding.embed_image(&data)?;
            Ok(index.search(&query, k)?)
        })
        .await?;
        return Ok(Json(to_results(hits)));
    }
    Err(ApiError::bad_request("No selected file"))
}

/// Rank stored images against a text query.
pub async fn search_by_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextSearchRequest>,
) -> ApiResult<Json<Vec<SearchResultResponse>>> {
    let query = req
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("No query specified"))?;

    let embedding = Arc::clone(&state.embedding);
    let index = Arc::clone(&state.index);
    let k = state.config.search.default_k;
    let hits = blocking(move || {
        let vector = embedding.embed_text(&query)?;
        Ok(index.search(&vector, k)?)
    })
    .await?;

    Ok(Json(to_results(hits)))
}

/// File names of every stored image, in insertion order.
pub async fn all_images(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    let store = Arc::clone(&state.store);
    let records = blocking(move || Ok(store.fetch_all()?)).await?;
    Ok(Json(
        records
            .into_iter()
            .map(|r| basename(&r.path).unwrap_or(r.path))
            .collect(),
    ))
}

/// Serve an uploaded file.
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let not_found = || ApiError::new(StatusCode::NOT_FOUND, "Image not found");
    let name = basename(&filename).ok_or_else(not_found)?;
    let path = state.upload_dir.join(&name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };
    Ok(([(header::CONTENT_TYPE, content_type(&name))], bytes).into_response())
}

fn content_type(name: &str) -> &'static str {
    let ext = FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Remove every stored image and the uploaded files.
pub async fn delete_all(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let store = Arc::clone(&state.store);
    let removed = blocking(move || Ok(store.clear()?)).await?;

    let mut files = 0usize;
    match tokio::fs::read_dir(&state.upload_dir).await {
        Ok(mut entries) => {
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    tokio::fs::remove_file(entry.path()).await?;
                    files += 1;
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    tracing::info!(removed, files, "all data deleted");
    Ok(Json(json!({ "message": "All data deleted successfully" })))
}

/// 3-D positions of every stored image for the visualization.
pub async fn image_points(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ImagePointResponse>>> {
    let store = Arc::clone(&state.store);
    let previews = Arc::clone(&state.previews);
    let points = blocking(move || match projection::project(&store, &*previews) {
        Ok(points) => Ok(points),
        Err(Error::InsufficientData { actual: 0, .. }) => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    })
    .await?;

    Ok(Json(
        points
            .into_iter()
            .map(|p| ImagePointResponse {
                id: p.id,
                image_data: p.preview,
                position: p.position,
            })
            .collect(),
    ))
}

/// One page of stored image names.
pub async fn paginated_images(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<PageResponse>> {
    let page_number = params.page.unwrap_or(1);
    let page_size = params
        .page_size
        .unwrap_or(state.config.pagination.default_page_size);

    let store = Arc::clone(&state.store);
    let page = blocking(move || Ok(pagination::page(&store, page_number, page_size)?)).await?;

    Ok(Json(PageResponse {
        images: page
            .records
            .into_iter()
            .map(|r| basename(&r.path).unwrap_or(r.path))
            .collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_strips_directories() {
        assert_eq!(basename("uploads/cat.jpg").as_deref(), Some("cat.jpg"));
        assert_eq!(basename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(basename(".."), None);
        assert_eq!(basename(""), None);
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type("a.JPG"), "image/jpeg");
        assert_eq!(content_type("a.webp"), "image/webp");
        assert_eq!(content_type("README"), "application/octet-stream");
    }
}
