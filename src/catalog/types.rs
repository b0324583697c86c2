//! Record and result types shared by the store and the engines that read it.

use serde::Serialize;

/// One stored image: the `images` table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    /// Assigned at insertion, ascending in insertion order, never reused.
    pub id: i64,
    /// Source file identifier; opaque to the catalog.
    pub path: String,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    /// RFC 3339 insertion time. `None` for rows migrated from legacy databases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub path: String,
    /// Cosine similarity in `[-1, 1]`. Always finite.
    pub score: f32,
}

/// A record placed in the 3-D visualization space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub id: i64,
    /// Each coordinate lies in `[-10, 10]`.
    pub position: [f32; 3],
    /// Opaque payload from the caller's [`super::projection::PreviewGenerator`].
    pub preview: String,
}

/// One page of records in insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub records: Vec<ImageRecord>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}
