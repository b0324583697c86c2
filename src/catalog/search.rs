//! Cosine-similarity ranking over the stored embeddings.
//!
//! [`SimilarityIndex`] is the seam callers program against; [`LinearScan`] is
//! the only strategy, a full O(n·d) pass over one store snapshot.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::catalog::store::EmbeddingStore;
use crate::catalog::types::{ImageRecord, SearchHit};
use crate::error::Result;

/// Score reported for records whose similarity is undefined.
pub const DEGENERATE_SCORE: f32 = -1.0;

/// Ranks stored images against a query vector.
pub trait SimilarityIndex: Send + Sync {
    /// Return at most `k` hits ordered by descending score, ties broken by
    /// ascending insertion order.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

/// Brute-force scan over every stored record.
#[derive(Debug, Clone)]
pub struct LinearScan {
    store: Arc<EmbeddingStore>,
}

impl LinearScan {
    pub fn new(store: Arc<EmbeddingStore>) -> Self {
        Self { store }
    }
}

impl SimilarityIndex for LinearScan {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.store.check_dimensions(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let records = self.store.fetch_all()?;
        let hits = rank(query, records, k);
        tracing::debug!(k, returned = hits.len(), "linear scan complete");
        Ok(hits)
    }
}

/// Cosine similarity of two equal-length vectors, or `None` when either has
/// zero norm or the result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    debug_assert_eq!(a.len(), b.len());
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return None;
    }
    Some(similarity.clamp(-1.0, 1.0) as f32)
}

/// Score every record and keep the best `k`. `records` must be in insertion
/// order; the stable sort preserves it among equal scores.
fn rank(query: &[f32], records: Vec<ImageRecord>, k: usize) -> Vec<SearchHit> {
    let mut scored: Vec<(Option<f32>, ImageRecord)> = records
        .into_iter()
        .map(|record| (cosine_similarity(query, &record.embedding), record))
        .collect();

    scored.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    scored
        .into_iter()
        .take(k)
        .map(|(score, record)| SearchHit {
            id: record.id,
            path: record.path,
            score: score.unwrap_or(DEGENERATE_SCORE),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let s = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert_relative_eq!(s, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        let s = cosine_similarity(&[1.0, 0.0], &[-3.0, 0.0]).unwrap();
        assert_relative_eq!(s, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_undefined() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_none());
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).is_none());
    }

    #[test]
    fn cosine_of_tiny_vectors_does_not_underflow() {
        let s = cosine_similarity(&[1e-30, 0.0], &[1e-30, 1e-30]).unwrap();
        assert_relative_eq!(s, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
    }

    fn record(id: i64, embedding: Vec<f32>) -> ImageRecord {
        ImageRecord {
            id,
            path: format!("{id}.jpg"),
            embedding,
            created_at: None,
        }
    }

    #[test]
    fn rank_puts_degenerate_last_even_below_negative_scores() {
        let records = vec![
            record(1, vec![0.0, 0.0]),
            record(2, vec![-1.0, 0.0]),
            record(3, vec![1.0, 0.0]),
        ];
        let hits = rank(&[1.0, 0.0], records, 3);
        let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(hits[2].score, DEGENERATE_SCORE);
    }

    #[test]
    fn rank_breaks_ties_by_insertion_order() {
        let records = vec![
            record(1, vec![0.0, 1.0]),
            record(2, vec![2.0, 0.0]),
            record(3, vec![5.0, 0.0]),
        ];
        let hits = rank(&[1.0, 0.0], records, 2);
        let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn zero_query_keeps_insertion_order() {
        let records = vec![record(1, vec![0.0, 1.0]), record(2, vec![1.0, 0.0])];
        let hits = rank(&[0.0, 0.0], records, 5);
        let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(hits.iter().all(|h| h.score == DEGENERATE_SCORE));
    }
}
