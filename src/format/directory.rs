//! Blocks info: the block table and the entry directory.

use std::collections::HashSet;

use super::reader::{ByteReader, ByteWriter};
use super::{BLOCKS_INFO_HASH_SIZE, block_flags, entry_flags};
use crate::codec::Compression;
use crate::{Error, Result};

/// Smallest encoded size of a block record.
const BLOCK_RECORD_SIZE: usize = 10;

/// Smallest encoded size of a directory record (empty name).
const ENTRY_RECORD_SIZE: usize = 21;

/// One storage block of the bundle's data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Size after decompression.
    pub uncompressed_size: u32,
    /// Stored size.
    pub compressed_size: u32,
    /// Block flags, see [`block_flags`](super::block_flags).
    pub flags: u16,
}

impl BlockInfo {
    /// Compression kind of this block.
    pub fn compression(&self) -> Result<Compression> {
        Compression::from_bits(u32::from(self.flags & block_flags::COMPRESSION_MASK))
    }
}

/// A named payload inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Offset into the decompressed data stream.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
    /// Entry flags, see [`entry_flags`](super::entry_flags).
    pub flags: u32,
    /// Entry name, unique within the bundle.
    pub name: String,
}

impl DirectoryEntry {
    /// Returns `true` if the entry is flagged as a serialized file.
    pub fn is_serialized_file(&self) -> bool {
        self.flags & entry_flags::SERIALIZED_FILE != 0
    }
}

/// The decoded blocks info section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlocksInfo {
    /// Hash of the uncompressed data, usually zero.
    pub hash: [u8; BLOCKS_INFO_HASH_SIZE],
    /// Storage blocks in stream order.
    pub blocks: Vec<BlockInfo>,
    /// Entries in directory order.
    pub entries: Vec<DirectoryEntry>,
}

impl BlocksInfo {
    /// Decodes an uncompressed blocks info section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerParse`] for negative or implausible counts,
    /// duplicate entry names, and entries that reach past the data stream.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data, true);
        let hash_bytes = r.read_bytes(BLOCKS_INFO_HASH_SIZE).map_err(reframe)?;
        let mut hash = [0u8; BLOCKS_INFO_HASH_SIZE];
        hash.copy_from_slice(hash_bytes);

        let block_count = read_count(&mut r, BLOCK_RECORD_SIZE, "block")?;
        let mut blocks = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            blocks.push(BlockInfo {
                uncompressed_size: r.read_u32().map_err(reframe)?,
                compressed_size: r.read_u32().map_err(reframe)?,
                flags: r.read_u16().map_err(reframe)?,
            });
        }

        let entry_count = read_count(&mut r, ENTRY_RECORD_SIZE, "entry")?;
        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let at = r.position() as u64;
            let offset = r.read_i64().map_err(reframe)?;
            let size = r.read_i64().map_err(reframe)?;
            let flags = r.read_u32().map_err(reframe)?;
            let name = r.read_cstring().map_err(reframe)?;
            if offset < 0 || size < 0 {
                return Err(Error::container(
                    at,
                    format!("negative range for entry '{}'", name),
                ));
            }
            entries.push(DirectoryEntry {
                offset: offset as u64,
                size: size as u64,
                flags,
                name,
            });
        }

        let info = Self {
            hash,
            blocks,
            entries,
        };
        info.validate()?;
        Ok(info)
    }

    fn validate(&self) -> Result<()> {
        let total = self.uncompressed_data_size();
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::container(
                    0,
                    format!("duplicate entry name '{}'", entry.name),
                ));
            }
            let end = entry.offset.checked_add(entry.size);
            if end.is_none_or(|end| end > total) {
                return Err(Error::container(
                    0,
                    format!(
                        "entry '{}' ({}+{}) exceeds data size {}",
                        entry.name, entry.offset, entry.size, total
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Encodes the section (uncompressed).
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new(true);
        w.write_bytes(&self.hash);
        w.write_i32(self.blocks.len() as i32);
        for block in &self.blocks {
            w.write_u32(block.uncompressed_size);
            w.write_u32(block.compressed_size);
            w.write_u16(block.flags);
        }
        w.write_i32(self.entries.len() as i32);
        for entry in &self.entries {
            w.write_i64(entry.offset as i64);
            w.write_i64(entry.size as i64);
            w.write_u32(entry.flags);
            w.write_cstring(&entry.name);
        }
        w.into_inner()
    }

    /// Total size of the decompressed data stream.
    pub fn uncompressed_data_size(&self) -> u64 {
        self.blocks
            .iter()
            .map(|b| u64::from(b.uncompressed_size))
            .sum()
    }

    /// Total stored size of the data stream.
    pub fn compressed_data_size(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.compressed_size)).sum()
    }

    /// Returns `true` if any block is compressed.
    pub fn has_compressed_blocks(&self) -> Result<bool> {
        for block in &self.blocks {
            if block.compression()? != Compression::None {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Splits `total` uncompressed bytes into stored blocks of at most `u32::MAX` bytes.
    pub(crate) fn uncompressed_blocks(total: u64) -> Vec<BlockInfo> {
        let mut blocks = Vec::new();
        let mut left = total;
        while left > 0 {
            let size = left.min(u64::from(u32::MAX)) as u32;
            blocks.push(BlockInfo {
                uncompressed_size: size,
                compressed_size: size,
                flags: block_flags::STREAMED,
            });
            left -= u64::from(size);
        }
        blocks
    }
}

fn read_count(r: &mut ByteReader<'_>, record_size: usize, what: &str) -> Result<usize> {
    let at = r.position() as u64;
    let count = r.read_i32().map_err(reframe)?;
    if count < 0 {
        return Err(Error::container(at, format!("negative {} count {}", what, count)));
    }
    let count = count as usize;
    if count.saturating_mul(record_size) > r.remaining() {
        return Err(Error::container(
            at,
            format!("{} count {} exceeds available data", what, count),
        ));
    }
    Ok(count)
}

fn reframe(e: Error) -> Error {
    match e {
        Error::Truncated { offset, needed } => Error::container(
            offset,
            format!("blocks info truncated ({} bytes missing)", needed),
        ),
        other => other,
    }
}
