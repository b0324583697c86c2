//! Image embedding store with similarity search and a 3-D map of the collection.
//!
//! clipdex keeps one fixed-length embedding per image in SQLite and answers
//! "which stored images are most like this vector?" by exact cosine
//! similarity. The vectors come from an external embedding model (image and
//! text share one space), so the same ranking serves both search-by-image and
//! search-by-text. The whole collection can also be reduced to three
//! principal components for display.
//!
//! # Architecture
//!
//! - **Storage**: SQLite table of `(id, path, embedding)` rows, embeddings as
//!   raw little-endian f32 blobs, ids never reused
//! - **Search**: exact cosine similarity, full linear scan behind
//!   [`catalog::search::SimilarityIndex`]
//! - **Projection**: PCA to 3 axes, each min-max scaled to `[-10, 10]`
//! - **Transport**: HTTP (axum) adapter in [`server`]
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`catalog`]: Embedding store, similarity search, projection, pagination
//! - [`embedding`]: Embedding provider contract and HTTP client implementation
//! - [`server`]: HTTP routes over the catalog

pub mod catalog;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod server;

pub use catalog::store::EmbeddingStore;
pub use catalog::types::ImageRecord;
pub use error::{Error, Result};
