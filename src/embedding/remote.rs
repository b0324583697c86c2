//! HTTP embedding provider.
//!
//! Talks to an embedding service that exposes:
//!
//! - `POST {endpoint}/embed/image` with the raw image bytes
//! - `POST {endpoint}/embed/text` with `{"text": "..."}`
//!
//! Both answer `{"embedding": [f32, ...]}`. The provider checks that every
//! returned vector has the configured length.

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for a remote embedding service.
///
/// Must be constructed inside a tokio runtime. The blocking trait methods
/// drive requests on that runtime and must be called from a blocking thread
/// (`spawn_blocking`), never from an async task.
pub struct RemoteEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    dimensions: usize,
    runtime: Handle,
}

impl RemoteEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("remote embedding provider must be created inside a tokio runtime")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        tracing::info!(
            endpoint = %config.endpoint,
            dims = config.dimensions,
            "remote embedding provider ready"
        );
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            dimensions: config.dimensions,
            runtime,
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/embed/{route}", self.endpoint)
    }

    fn finish(&self, response: EmbeddingResponse) -> Result<Vec<f32>> {
        ensure!(
            response.embedding.len() == self.dimensions,
            "embedding service returned {} dimensions, expected {}",
            response.embedding.len(),
            self.dimensions
        );
        Ok(response.embedding)
    }
}

async fn send(request: reqwest::RequestBuilder, url: &str) -> Result<EmbeddingResponse> {
    let response = request
        .send()
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;
    ensure!(
        response.status().is_success(),
        "embedding service answered HTTP {}",
        response.status()
    );
    response.json().await.context("invalid embedding response")
}

impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let url = self.url("image");
        let request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec());

        let response = self.runtime.block_on(send(request, &url))?;
        self.finish(response)
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.url("text");
        let request = self.client.post(&url).json(&TextRequest { text });

        let response = self.runtime.block_on(send(request, &url))?;
        self.finish(response)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
