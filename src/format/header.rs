//! UnityFS header parsing and encoding.

use std::io::{self, Read, Write};

use super::reader::{read_cstring, read_i64_be, read_u32_be};
use super::{BlocksInfo, HEADER_ALIGNMENT, SIGNATURE, align_up, flags};
use crate::codec::{Compression, compress_block};
use crate::{Error, Result};

/// The fixed header at the start of every UnityFS bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleHeader {
    /// Bundle format version (6, 7 or 8 in practice).
    pub format_version: u32,
    /// Player version string, usually `5.x.x`.
    pub unity_version: String,
    /// Engine revision that produced the bundle, e.g. `2019.4.0f1`.
    pub unity_revision: String,
    /// Total file size in bytes.
    pub size: i64,
    /// Stored size of the blocks info.
    pub compressed_blocks_info_size: u32,
    /// Size of the blocks info after decompression.
    pub uncompressed_blocks_info_size: u32,
    /// Header flags, see [`flags`](super::flags).
    pub flags: u32,
}

impl BundleHeader {
    /// Reads a header from the current position of `r`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerParse`] if the signature is not `UnityFS` or
    /// any field is truncated.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let signature = read_cstring(r).map_err(|e| header_error(0, e))?;
        if signature != SIGNATURE {
            return Err(Error::container(
                0,
                format!("unsupported signature '{}'", signature),
            ));
        }

        let format_version = read_u32_be(r).map_err(|e| header_error(8, e))?;
        let unity_version = read_cstring(r).map_err(|e| header_error(12, e))?;
        let unity_revision = read_cstring(r).map_err(|e| header_error(12, e))?;

        let tail = 12 + unity_version.len() as u64 + unity_revision.len() as u64 + 2;
        let size = read_i64_be(r).map_err(|e| header_error(tail, e))?;
        let compressed_blocks_info_size = read_u32_be(r).map_err(|e| header_error(tail + 8, e))?;
        let uncompressed_blocks_info_size =
            read_u32_be(r).map_err(|e| header_error(tail + 12, e))?;
        let flags = read_u32_be(r).map_err(|e| header_error(tail + 16, e))?;

        Ok(Self {
            format_version,
            unity_version,
            unity_revision,
            size,
            compressed_blocks_info_size,
            uncompressed_blocks_info_size,
            flags,
        })
    }

    /// Writes the header to `w`.
    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(SIGNATURE.as_bytes())?;
        w.write_all(&[0])?;
        w.write_all(&self.format_version.to_be_bytes())?;
        w.write_all(self.unity_version.as_bytes())?;
        w.write_all(&[0])?;
        w.write_all(self.unity_revision.as_bytes())?;
        w.write_all(&[0])?;
        w.write_all(&self.size.to_be_bytes())?;
        w.write_all(&self.compressed_blocks_info_size.to_be_bytes())?;
        w.write_all(&self.uncompressed_blocks_info_size.to_be_bytes())?;
        w.write_all(&self.flags.to_be_bytes())
    }

    /// Number of bytes [`write`](Self::write) produces.
    pub fn encoded_len(&self) -> u64 {
        (SIGNATURE.len() + 1 + 4 + self.unity_version.len() + 1 + self.unity_revision.len() + 1)
            as u64
            + 8
            + 4
            + 4
            + 4
    }

    /// Returns `true` if a 16-byte alignment follows the header.
    pub fn aligns_after_header(&self) -> bool {
        self.format_version >= 7
    }

    /// Compression kind of the blocks info.
    pub fn blocks_info_compression(&self) -> Result<Compression> {
        Compression::from_bits(self.flags & flags::COMPRESSION_MASK)
    }

    /// Returns `true` if the blocks info is stored after the block data.
    pub fn blocks_info_at_end(&self) -> bool {
        self.flags & flags::BLOCKS_INFO_AT_END != 0
    }

    /// Returns `true` if the block data starts on a 16-byte boundary.
    pub fn pads_blocks_info(&self) -> bool {
        self.flags & flags::BLOCKS_INFO_PADDING != 0
    }

    /// Returns a copy for a rewritten bundle.
    ///
    /// The copy keeps the version strings, moves the blocks info to the front
    /// with `info_compression`, and drops the padding flag.
    pub(crate) fn rewritten(&self, info_compression: Compression) -> Self {
        let kept = self.flags
            & !(flags::COMPRESSION_MASK | flags::BLOCKS_INFO_AT_END | flags::BLOCKS_INFO_PADDING);
        Self {
            format_version: self.format_version,
            unity_version: self.unity_version.clone(),
            unity_revision: self.unity_revision.clone(),
            size: 0,
            compressed_blocks_info_size: 0,
            uncompressed_blocks_info_size: 0,
            flags: kept | flags::HAS_DIRECTORY_INFO | info_compression.bits(),
        }
    }
}

/// Writes header, alignment padding and blocks info for a new bundle.
///
/// Sizes in the header are derived from `info`, so the block data that the
/// caller writes next must match the stored sizes of `info.blocks`. Returns
/// the number of bytes written, which is also the data stream offset.
pub(crate) fn write_preamble<W: Write + ?Sized>(
    out: &mut W,
    template: &BundleHeader,
    info: &BlocksInfo,
    info_compression: Compression,
) -> Result<u64> {
    let raw = info.encode();
    let mut stored = compress_block(info_compression, &raw)?;
    let mut info_compression = info_compression;
    if stored.len() >= raw.len() {
        stored = raw.clone();
        info_compression = Compression::None;
    }

    let mut header = template.rewritten(info_compression);
    header.compressed_blocks_info_size = stored.len() as u32;
    header.uncompressed_blocks_info_size = raw.len() as u32;

    let header_len = header.encoded_len();
    let padded = if header.aligns_after_header() {
        align_up(header_len, HEADER_ALIGNMENT)
    } else {
        header_len
    };
    header.size = (padded + stored.len() as u64 + info.compressed_data_size()) as i64;

    header.write(out)?;
    out.write_all(&vec![0u8; (padded - header_len) as usize])?;
    out.write_all(&stored)?;
    Ok(padded + stored.len() as u64)
}

fn header_error(offset: u64, e: io::Error) -> Error {
    Error::container(offset, format!("truncated header: {}", e))
}
