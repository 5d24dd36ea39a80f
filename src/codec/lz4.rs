//! LZ4 block codec.
//!
//! Unity stores raw LZ4 blocks without frame headers, so this wraps the
//! `lz4_flex` block API rather than its frame encoder.

use lz4_flex::block;

use crate::{Error, Result};

/// Best compression ratio an LZ4 block can reach.
const MAX_RATIO: usize = 255;

/// Decodes a raw LZ4 block of known output size.
pub fn decompress(input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    if uncompressed_size > input.len().saturating_mul(MAX_RATIO).saturating_add(16) {
        return Err(Error::Codec {
            method: "LZ4",
            reason: format!(
                "{} bytes cannot decode to {} bytes",
                input.len(),
                uncompressed_size
            ),
        });
    }
    block::decompress(input, uncompressed_size).map_err(|e| Error::Codec {
        method: "LZ4",
        reason: e.to_string(),
    })
}

/// Encodes a raw LZ4 block.
pub fn compress(input: &[u8]) -> Vec<u8> {
    block::compress(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"CAB-0123456789abcdef CAB-0123456789abcdef".repeat(8);
        let packed = compress(&data);
        assert_eq!(decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_impossible_size_rejected() {
        let packed = compress(b"small block");
        let err = decompress(&packed, 3 << 30).unwrap_err();
        assert!(matches!(err, Error::Codec { method: "LZ4", .. }));

        let zeros = vec![0u8; 1 << 20];
        assert_eq!(decompress(&compress(&zeros), zeros.len()).unwrap(), zeros);
    }

    #[test]
    fn test_corrupt_input() {
        let err = decompress(&[0xF0, 0x01], 64).unwrap_err();
        assert!(matches!(err, Error::Codec { method: "LZ4", .. }));
    }
}
