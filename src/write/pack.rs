//! Recompression of decompressed bundles.

use std::io::{Read, Seek, Write};

use super::WriteResult;
use crate::codec::{Compression, compress_block};
use crate::format::header::write_preamble;
use crate::format::{BlockInfo, BlocksInfo, LZ4_CHUNK_SIZE, block_flags};
use crate::read::Bundle;
use crate::{Error, Result};

/// Writes a compressed copy of a decompressed `bundle` to `out`.
///
/// LZ4 and LZ4HC split the data stream into 128 KiB chunks; LZMA stores it
/// as one block. A chunk that does not shrink is stored raw. The blocks
/// info is LZ4-compressed when that makes it smaller. Entries are kept as-is.
///
/// # Errors
///
/// Returns [`Error::CompressedBundle`] if `bundle` is still compressed and
/// [`Error::UnsupportedCompression`] if the codec's feature is disabled.
pub fn pack_bundle<R, W>(
    bundle: &mut Bundle<R>,
    compression: Compression,
    out: &mut W,
) -> Result<WriteResult>
where
    R: Read + Seek,
    W: Write,
{
    if bundle.is_compressed() {
        return Err(Error::CompressedBundle {
            compression: bundle.compression().name(),
        });
    }
    if !compression.is_supported() {
        return Err(Error::UnsupportedCompression {
            kind: compression.bits(),
        });
    }

    let chunk_size = match compression {
        Compression::Lz4 | Compression::Lz4Hc => LZ4_CHUNK_SIZE as u64,
        Compression::None | Compression::Lzma => u64::from(u32::MAX),
    };
    let data_size = bundle.data_size();
    log::info!(
        "Packing {} bytes with {} ({} byte chunks)",
        data_size,
        compression,
        chunk_size
    );

    let mut blocks = Vec::new();
    let mut stored = Vec::new();
    let mut raw = Vec::new();
    let mut offset = 0u64;
    while offset < data_size {
        let len = chunk_size.min(data_size - offset);
        raw.clear();
        bundle.copy_region(offset, len, &mut raw)?;

        let packed = compress_block(compression, &raw)?;
        let (kind, bytes) = if packed.len() < raw.len() {
            (compression, packed)
        } else {
            (Compression::None, raw.clone())
        };
        blocks.push(BlockInfo {
            uncompressed_size: len as u32,
            compressed_size: bytes.len() as u32,
            flags: block_flags::STREAMED | kind.bits() as u16,
        });
        stored.push(bytes);
        offset += len;
    }

    let info = BlocksInfo {
        hash: bundle.blocks_info().hash,
        blocks,
        entries: bundle.entries().to_vec(),
    };
    let info_compression = if compression == Compression::None {
        Compression::None
    } else {
        lz4_or_none()
    };
    let header_size = write_preamble(out, bundle.header(), &info, info_compression)?;
    for block in &stored {
        out.write_all(block)?;
    }

    Ok(WriteResult {
        entries_written: info.entries.len(),
        entries_replaced: 0,
        data_size,
        total_size: header_size + info.compressed_data_size(),
    })
}

fn lz4_or_none() -> Compression {
    if Compression::Lz4.is_supported() {
        Compression::Lz4
    } else {
        Compression::None
    }
}
