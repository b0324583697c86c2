pub mod ingest;
pub mod reset;
pub mod search;
pub mod stats;

use std::sync::Arc;

use anyhow::{Context, Result};
use clipdex::config::ClipdexConfig;
use clipdex::embedding::{self, EmbeddingProvider};
use clipdex::EmbeddingStore;

/// Open the configured store.
pub fn open_store(config: &ClipdexConfig) -> Result<EmbeddingStore> {
    let db_path = config.resolved_db_path();
    EmbeddingStore::open(&db_path, config.embedding.dimensions)
        .with_context(|| format!("failed to open image store at {}", db_path.display()))
}

/// Create the configured embedding provider.
pub fn open_provider(config: &ClipdexConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = embedding::create_provider(&config.embedding)
        .context("failed to create embedding provider")?;
    Ok(Arc::from(provider))
}
