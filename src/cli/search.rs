use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use clipdex::catalog::search::{LinearScan, SimilarityIndex};
use clipdex::config::ClipdexConfig;

/// What to search with.
pub enum SearchQuery {
    Text(String),
    Image(PathBuf),
}

/// Run a similarity search from the terminal.
pub async fn search(config: &ClipdexConfig, query: SearchQuery, k: Option<usize>) -> Result<()> {
    let store = Arc::new(super::open_store(config)?);
    let provider = super::open_provider(config)?;
    let k = k.unwrap_or(config.search.default_k);

    let query_embedding = match query {
        SearchQuery::Text(text) => {
            tokio::task::spawn_blocking(move || provider.embed_text(&text)).await??
        }
        SearchQuery::Image(path) => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            tokio::task::spawn_blocking(move || provider.embed_image(&bytes)).await??
        }
    };

    let index = LinearScan::new(store);
    let hits = tokio::task::spawn_blocking(move || index.search(&query_embedding, k)).await??;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Top {} result(s):\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {:>2}. {:>6.2}%  #{:<6} {}",
            i + 1,
            hit.score * 100.0,
            hit.id,
            hit.path
        );
    }

    Ok(())
}
