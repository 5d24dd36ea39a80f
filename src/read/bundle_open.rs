//! Bundle opening.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::Bundle;
use crate::codec::{Compression, decompress_block};
use crate::format::{BlocksInfo, BundleHeader, HEADER_ALIGNMENT, align_up};
use crate::{Error, Result};

impl<R: Read + Seek> Bundle<R> {
    /// Parses the header and directory of a bundle.
    ///
    /// The reader may be positioned anywhere; parsing starts at offset 0.
    /// Block data is not touched until entries are read or unpacked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerParse`] if the header or blocks info cannot
    /// be decoded, and [`Error::UnsupportedCompression`] for unknown kinds.
    pub fn open(mut reader: R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header = BundleHeader::read(&mut reader)?;
        let mut pos = header.encoded_len();
        if header.aligns_after_header() {
            pos = align_up(pos, HEADER_ALIGNMENT);
        }

        let info_len = u64::from(header.compressed_blocks_info_size);
        let info_pos = if header.blocks_info_at_end() {
            file_len
                .checked_sub(info_len)
                .ok_or_else(|| Error::container(0, "blocks info larger than file"))?
        } else {
            pos
        };
        if info_pos + info_len > file_len {
            return Err(Error::container(
                info_pos,
                format!(
                    "blocks info of {} bytes extends past end of file ({} bytes)",
                    info_len, file_len
                ),
            ));
        }

        reader.seek(SeekFrom::Start(info_pos))?;
        let mut stored = vec![0u8; info_len as usize];
        reader.read_exact(&mut stored)?;

        let info_compression = header.blocks_info_compression()?;
        let raw = decompress_block(
            info_compression,
            &stored,
            header.uncompressed_blocks_info_size as usize,
        )?;
        let info = BlocksInfo::parse(&raw)?;

        let mut data_offset = if header.blocks_info_at_end() {
            pos
        } else {
            pos + info_len
        };
        if header.pads_blocks_info() {
            data_offset = align_up(data_offset, HEADER_ALIGNMENT);
        }

        let data_end = if header.blocks_info_at_end() {
            info_pos
        } else {
            file_len
        };
        let stored_data = info.compressed_data_size();
        if data_offset + stored_data > data_end {
            return Err(Error::container(
                data_offset,
                format!(
                    "block data of {} bytes extends past available {}",
                    stored_data,
                    data_end.saturating_sub(data_offset)
                ),
            ));
        }

        let mut blocks_compression = Compression::None;
        for block in &info.blocks {
            let kind = block.compression()?;
            if kind != Compression::None {
                blocks_compression = kind;
                break;
            }
        }
        let compression = if info_compression != Compression::None {
            info_compression
        } else {
            blocks_compression
        };

        log::debug!(
            "Opened bundle {} ({} entries, {} blocks, compression {})",
            header.unity_revision,
            info.entries.len(),
            info.blocks.len(),
            compression
        );

        Ok(Self {
            reader,
            header,
            info,
            data_offset,
            compression,
            blocks_compression,
        })
    }
}

impl Bundle<BufReader<File>> {
    /// Opens a bundle from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if the path does not exist.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        Self::open(BufReader::new(file))
    }
}
