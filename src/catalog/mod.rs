pub mod pagination;
pub mod pca;
pub mod projection;
pub mod search;
pub mod store;
pub mod types;

/// Encode an embedding as raw little-endian f32 bytes, the on-disk layout of
/// the `images.embedding` column.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode raw little-endian f32 bytes. Returns `None` if the length is not a
/// multiple of four.
pub fn bytes_to_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_little_endian() {
        assert_eq!(embedding_to_bytes(&[1.0]), vec![0x00, 0x00, 0x80, 0x3f]);
    }

    #[test]
    fn decode_rejects_ragged_blob() {
        assert!(bytes_to_embedding(&[0, 0, 128]).is_none());
    }

    #[test]
    fn decode_preserves_special_values() {
        let v = vec![-0.0, f32::MIN_POSITIVE, 3.5e7, -1.25];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)).unwrap(), v);
    }
}
