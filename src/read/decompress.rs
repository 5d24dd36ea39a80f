//! Unpacking compressed bundles into a scratch store.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use super::Bundle;
use crate::codec::{Compression, decompress_block};
use crate::format::block_flags;
use crate::format::header::write_preamble;
use crate::format::{BlockInfo, BlocksInfo};
use crate::{Error, Result};

/// Where a compressed bundle is unpacked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scratch {
    /// Unpack into an in-memory buffer.
    Memory,
    /// Unpack into a side file, created or truncated.
    Disk(PathBuf),
}

/// The byte source behind a decompressed [`Bundle`].
#[derive(Debug)]
pub enum Payload<R> {
    /// The original reader; the bundle was not compressed.
    Source(R),
    /// An unpacked copy on disk.
    Disk(BufReader<File>),
    /// An unpacked copy in memory.
    Memory(Cursor<Vec<u8>>),
}

impl<R: Read> Read for Payload<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Payload::Source(r) => r.read(buf),
            Payload::Disk(r) => r.read(buf),
            Payload::Memory(r) => r.read(buf),
        }
    }
}

impl<R: Seek> Seek for Payload<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Payload::Source(r) => r.seek(pos),
            Payload::Disk(r) => r.seek(pos),
            Payload::Memory(r) => r.seek(pos),
        }
    }
}

impl<R: Read + Seek> Bundle<R> {
    /// Writes the decompressed form of this bundle to `out`.
    ///
    /// The output keeps the header strings, entry directory and block
    /// boundaries; every block is stored uncompressed and the blocks info is
    /// placed uncompressed at the front. Returns the number of bytes written.
    pub fn unpack<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<u64> {
        let blocks: Vec<BlockInfo> = self
            .info
            .blocks
            .iter()
            .map(|b| BlockInfo {
                uncompressed_size: b.uncompressed_size,
                compressed_size: b.uncompressed_size,
                flags: b.flags & !block_flags::COMPRESSION_MASK,
            })
            .collect();
        let info = BlocksInfo {
            hash: self.info.hash,
            blocks,
            entries: self.info.entries.clone(),
        };

        let mut written = write_preamble(out, &self.header, &info, Compression::None)?;

        self.reader.seek(SeekFrom::Start(self.data_offset))?;
        let mut stored = Vec::new();
        for (index, block) in self.info.blocks.iter().enumerate() {
            stored.resize(block.compressed_size as usize, 0);
            self.reader.read_exact(&mut stored)?;
            let data = decompress_block(
                block.compression()?,
                &stored,
                block.uncompressed_size as usize,
            )?;
            out.write_all(&data)?;
            written += data.len() as u64;
            log::trace!("Unpacked block {} ({} bytes)", index, data.len());
        }
        Ok(written)
    }
}

/// Decompresses a bundle into `scratch` and re-parses it.
///
/// An uncompressed bundle is returned as-is over [`Payload::Source`] and no
/// scratch store is created. Otherwise the original reader is dropped once
/// unpacking completes.
///
/// # Errors
///
/// Returns [`Error::WriteFailure`] if the scratch file cannot be created,
/// and codec or parse errors from the block data.
pub fn decompress_bundle<R: Read + Seek>(
    mut bundle: Bundle<R>,
    scratch: &Scratch,
) -> Result<Bundle<Payload<R>>> {
    if !bundle.is_compressed() {
        return Ok(bundle.map_reader(Payload::Source));
    }

    log::info!(
        "Decompressing {} bundle ({} bytes)",
        bundle.compression(),
        bundle.data_size()
    );

    match scratch {
        Scratch::Memory => {
            let mut buf = Vec::new();
            bundle.unpack(&mut buf)?;
            drop(bundle);
            Bundle::open(Payload::Memory(Cursor::new(buf)))
        }
        Scratch::Disk(path) => {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .map_err(|source| Error::WriteFailure {
                    path: path.clone(),
                    source,
                })?;
            let mut writer = BufWriter::new(file);
            bundle.unpack(&mut writer)?;
            let file = writer.into_inner().map_err(|e| Error::WriteFailure {
                path: path.clone(),
                source: e.into_error(),
            })?;
            drop(bundle);
            Bundle::open(Payload::Disk(BufReader::new(file)))
        }
    }
}
