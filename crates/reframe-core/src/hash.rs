//! Content hashing for deterministic rendering verification.
//!
//! Produces a SHA-256 hash of frame buffer data, enabling bit-exact
//! output verification across strategies and runs.

use sha2::{Digest, Sha256};

use crate::frame::FrameBuffer;

/// A content hash digest (SHA-256, 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the content hash of a single frame buffer.
pub fn hash_frame(frame: &FrameBuffer) -> ContentHash {
    let mut hasher = Sha256::new();
    // Dimensions are part of the digest so a 2x8 and a 4x4 frame with the
    // same bytes differ.
    hasher.update(frame.width.to_le_bytes());
    hasher.update(frame.height.to_le_bytes());
    hasher.update(&frame.data);
    finish(hasher)
}

fn finish(hasher: Sha256) -> ContentHash {
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    ContentHash::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> FrameBuffer {
        let pixels = vec![rgba; (width * height) as usize];
        FrameBuffer::from_pixels(width, height, &pixels).unwrap()
    }

    #[test]
    fn test_hash_deterministic() {
        let frame1 = solid(10, 10, [255, 0, 0, 255]);
        let frame2 = solid(10, 10, [255, 0, 0, 255]);
        assert_eq!(hash_frame(&frame1), hash_frame(&frame2));
    }

    #[test]
    fn test_hash_different_content() {
        let frame1 = solid(10, 10, [255, 0, 0, 255]);
        let frame2 = solid(10, 10, [0, 0, 255, 255]);
        assert_ne!(hash_frame(&frame1), hash_frame(&frame2));
    }

    #[test]
    fn test_hash_different_shape_same_bytes() {
        let frame1 = solid(2, 8, [7, 7, 7, 7]);
        let frame2 = solid(4, 4, [7, 7, 7, 7]);
        assert_eq!(frame1.data, frame2.data);
        assert_ne!(hash_frame(&frame1), hash_frame(&frame2));
    }

    #[test]
    fn test_hash_hex_format() {
        let hash = hash_frame(&solid(1, 1, [1, 2, 3, 4]));
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64); // SHA-256 = 64 hex chars
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(format!("{}", hash), hex);
    }
}
