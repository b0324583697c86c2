#![allow(dead_code)]

use std::sync::Arc;

use clipdex::EmbeddingStore;

/// Dimension used by the integration tests.
pub const DIM: usize = 8;

/// Open a fresh in-memory store of [`DIM`]-length vectors.
pub fn test_store() -> Arc<EmbeddingStore> {
    Arc::new(EmbeddingStore::open_in_memory(DIM).unwrap())
}

/// Unit vector along `axis`.
pub fn unit(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[axis % DIM] = 1.0;
    v
}

/// Vector from leading components, zero-padded to [`DIM`].
pub fn padded(head: &[f32]) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[..head.len()].copy_from_slice(head);
    v
}

/// Deterministic, spread-out test vector for `seed`.
pub fn test_embedding(seed: u32) -> Vec<f32> {
    (0..DIM)
        .map(|i| {
            let x = (seed as f32 + 1.0) * (i as f32 + 1.0) * 0.618_034;
            x.sin() + 0.1 * (seed % 7) as f32
        })
        .collect()
}

/// Insert `n` images named `img{i}.jpg` with [`test_embedding`] vectors.
/// Returns their ids in insertion order.
pub fn fill(store: &EmbeddingStore, n: u32) -> Vec<i64> {
    (0..n)
        .map(|i| store.insert(&format!("img{i}.jpg"), &test_embedding(i)).unwrap())
        .collect()
}
