//! Byte codec for persisted embeddings.
//!
//! Embeddings are stored as raw little-endian f32 buffers, length =
//! dimension x 4, with no header. Dimensionality is implicit: the
//! embedding model in use fixes it for a deployment, so it is not
//! embedded in the blob.

use keepsake_types::error::EmbeddingError;

/// Encode a vector as a little-endian f32 byte buffer.
pub fn encode(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a little-endian f32 byte buffer back into a vector.
///
/// Fails with [`EmbeddingError::MalformedBlob`] when the byte length is
/// not a multiple of 4.
pub fn decode(blob: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
    if blob.len() % 4 != 0 {
        return Err(EmbeddingError::MalformedBlob(blob.len()));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
