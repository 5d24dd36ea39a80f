//! Block compression for bundle data.
//!
//! Unity compresses the blocks info and each data block independently with
//! one of four kinds, recorded in the low six bits of the respective flags.
//! Blocks are small enough to be handled in one shot, so this module exposes
//! a buffer-to-buffer interface: [`decompress_block`] and [`compress_block`].

#[cfg(feature = "lz4")]
pub mod lz4;

#[cfg(feature = "lzma")]
pub mod lzma;

use crate::{Error, Result};

/// Compression kinds understood by UnityFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Stored as-is.
    #[default]
    None,
    /// LZMA with a 5-byte properties prefix.
    Lzma,
    /// Raw LZ4 block.
    Lz4,
    /// Raw LZ4 block produced by the high-compression encoder.
    Lz4Hc,
}

impl Compression {
    /// Decodes the compression bits of a flags field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCompression`] for kinds other than 0-3.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(Self::None),
            1 => Ok(Self::Lzma),
            2 => Ok(Self::Lz4),
            3 => Ok(Self::Lz4Hc),
            kind => Err(Error::UnsupportedCompression { kind }),
        }
    }

    /// The value stored in the compression bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Lzma => 1,
            Self::Lz4 => 2,
            Self::Lz4Hc => 3,
        }
    }

    /// Returns a human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lzma => "LZMA",
            Self::Lz4 => "LZ4",
            Self::Lz4Hc => "LZ4HC",
        }
    }

    /// Returns whether this build can encode and decode the kind.
    pub fn is_supported(self) -> bool {
        match self {
            Self::None => true,
            Self::Lzma => cfg!(feature = "lzma"),
            Self::Lz4 | Self::Lz4Hc => cfg!(feature = "lz4"),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decompresses one block to exactly `uncompressed_size` bytes.
///
/// # Errors
///
/// Returns [`Error::Codec`] if the data is corrupt or decodes to a different
/// size, and [`Error::UnsupportedCompression`] if the codec is not compiled in.
pub fn decompress_block(
    kind: Compression,
    input: &[u8],
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    let out = match kind {
        Compression::None => input.to_vec(),
        #[cfg(feature = "lz4")]
        Compression::Lz4 | Compression::Lz4Hc => lz4::decompress(input, uncompressed_size)?,
        #[cfg(feature = "lzma")]
        Compression::Lzma => lzma::decompress(input, uncompressed_size)?,
        #[allow(unreachable_patterns)]
        other => {
            return Err(Error::UnsupportedCompression { kind: other.bits() });
        }
    };

    if out.len() != uncompressed_size {
        return Err(Error::Codec {
            method: kind.name(),
            reason: format!(
                "expected {} bytes, decoded {}",
                uncompressed_size,
                out.len()
            ),
        });
    }
    Ok(out)
}

/// Compresses one block.
///
/// LZ4 and LZ4HC both use the `lz4_flex` block encoder; the kind only
/// changes the label stored in the flags.
pub fn compress_block(kind: Compression, input: &[u8]) -> Result<Vec<u8>> {
    match kind {
        Compression::None => Ok(input.to_vec()),
        #[cfg(feature = "lz4")]
        Compression::Lz4 | Compression::Lz4Hc => Ok(lz4::compress(input)),
        #[cfg(feature = "lzma")]
        Compression::Lzma => lzma::compress(input),
        #[allow(unreachable_patterns)]
        other => Err(Error::UnsupportedCompression { kind: other.bits() }),
    }
}
