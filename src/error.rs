//! Error taxonomy for the catalog core.
//!
//! Every core operation returns [`Result`]. Adapters (HTTP, CLI, config) wrap
//! these in `anyhow` with context instead.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the embedding store and the engines that read it.
#[derive(Error, Debug)]
pub enum Error {
    /// A vector's length disagrees with the store's configured dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persistence failure in the underlying SQLite database.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A stored embedding blob does not decode to a whole number of f32 values
    /// of the configured dimension.
    #[error("corrupt embedding for image {id}: {bytes} bytes")]
    CorruptRecord { id: i64, bytes: usize },

    /// Projection was requested over too few records.
    #[error("insufficient data: need at least {required} images, have {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// No image with the given id exists.
    #[error("image not found: {id}")]
    NotFound { id: i64 },

    /// Caller-supplied argument is outside the operation's domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// `true` for failures of the persistence layer itself.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::CorruptRecord { .. })
    }
}
