//! Bundle reading API.
//!
//! [`Bundle`] parses the header and directory of a UnityFS file and gives
//! access to entry bytes once the data stream is stored uncompressed.
//! Compressed bundles are first unpacked with [`decompress_bundle`] into a
//! [`Scratch`] store (a `.decomp` side file or memory) and re-parsed.
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlepatch::read::{Bundle, Scratch, decompress_bundle};
//!
//! let bundle = Bundle::open_path("level0.bundle")?;
//! let mut bundle = decompress_bundle(bundle, &Scratch::Memory)?;
//! for entry in bundle.entries().to_vec() {
//!     let bytes = bundle.read_entry(&entry.name)?;
//!     println!("{}: {} bytes", entry.name, bytes.len());
//! }
//! # Ok::<(), bundlepatch::Error>(())
//! ```

mod bundle_open;
mod decompress;

pub use decompress::{Payload, Scratch, decompress_bundle};

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::codec::Compression;
use crate::format::{BlockInfo, BlocksInfo, BundleHeader, DirectoryEntry};
use crate::{Error, Result};

/// A parsed UnityFS bundle over a seekable reader.
pub struct Bundle<R> {
    pub(crate) reader: R,
    pub(crate) header: BundleHeader,
    pub(crate) info: BlocksInfo,
    pub(crate) data_offset: u64,
    pub(crate) compression: Compression,
    pub(crate) blocks_compression: Compression,
}

impl<R> std::fmt::Debug for Bundle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("header", &self.header)
            .field("entries", &self.info.entries.len())
            .field("compression", &self.compression)
            .finish_non_exhaustive()
    }
}

impl<R> Bundle<R> {
    /// Returns the bundle header.
    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    /// Returns the entries in directory order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.info.entries
    }

    /// Returns the storage blocks.
    pub fn blocks(&self) -> &[BlockInfo] {
        &self.info.blocks
    }

    /// Returns the decoded blocks info.
    pub fn blocks_info(&self) -> &BlocksInfo {
        &self.info
    }

    /// Looks up an entry by name.
    pub fn entry(&self, name: &str) -> Option<&DirectoryEntry> {
        self.info.entries.iter().find(|e| e.name == name)
    }

    /// Returns `true` if an entry with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// The bundle's compression kind.
    ///
    /// This is the first kind other than [`Compression::None`] among the
    /// blocks info and the data blocks.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Returns `true` if anything in the bundle is compressed.
    pub fn is_compressed(&self) -> bool {
        self.compression != Compression::None
    }

    /// Absolute offset of the data stream in the underlying reader.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Size of the decompressed data stream.
    pub fn data_size(&self) -> u64 {
        self.info.uncompressed_data_size()
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Replaces the reader with `f(reader)`, keeping the parsed layout.
    pub(crate) fn map_reader<S>(self, f: impl FnOnce(R) -> S) -> Bundle<S> {
        Bundle {
            reader: f(self.reader),
            header: self.header,
            info: self.info,
            data_offset: self.data_offset,
            compression: self.compression,
            blocks_compression: self.blocks_compression,
        }
    }

    fn require_uncompressed(&self) -> Result<()> {
        if self.blocks_compression != Compression::None {
            return Err(Error::CompressedBundle {
                compression: self.blocks_compression.name(),
            });
        }
        Ok(())
    }
}

impl<R: Read + Seek> Bundle<R> {
    /// Streams `len` bytes of the data stream starting at `offset` into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompressedBundle`] if the data blocks are compressed,
    /// and [`Error::ContainerParse`] if the range is outside the data stream.
    pub fn copy_region<W: Write + ?Sized>(
        &mut self,
        offset: u64,
        len: u64,
        out: &mut W,
    ) -> Result<u64> {
        self.require_uncompressed()?;
        let total = self.data_size();
        if offset.checked_add(len).is_none_or(|end| end > total) {
            return Err(Error::container(
                offset,
                format!("region of {} bytes outside data stream of {}", len, total),
            ));
        }

        self.reader
            .seek(SeekFrom::Start(self.data_offset + offset))?;
        let copied = io::copy(&mut (&mut self.reader).take(len), out)?;
        if copied != len {
            return Err(Error::Truncated {
                offset: self.data_offset + offset + copied,
                needed: len - copied,
            });
        }
        Ok(copied)
    }

    /// Reads the bytes of the named entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] if no such entry exists.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let (offset, size) = self
            .entry(name)
            .map(|e| (e.offset, e.size))
            .ok_or_else(|| Error::EntryNotFound { name: name.into() })?;
        let mut out = Vec::with_capacity(size as usize);
        self.copy_region(offset, size, &mut out)?;
        Ok(out)
    }
}
