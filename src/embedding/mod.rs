//! Image/text-to-vector embedding contract.
//!
//! The catalog never computes embeddings. It stores and compares whatever an
//! [`EmbeddingProvider`] returns. The shipped provider is
//! [`remote::RemoteEmbeddingProvider`], a client for an HTTP embedding
//! service; it is created via [`create_provider`] from configuration.

pub mod remote;

use anyhow::Result;

/// Turns images and text into vectors in one shared similarity space.
///
/// Implementations must be deterministic for a fixed input and always return
/// exactly [`dimensions`](Self::dimensions) components. All methods are
/// synchronous; callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed encoded image bytes (JPEG, PNG, WebP, ...).
    fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>>;

    /// Embed a free-text query.
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Number of components every returned vector has.
    fn dimensions(&self) -> usize;
}

/// Create an embedding provider from config.
///
/// Currently only `"remote"` is supported.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "remote" => {
            let provider = remote::RemoteEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: remote"),
    }
}
