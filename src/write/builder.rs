//! Assembly of new bundles from named payloads.

use std::io::Write;

use crate::codec::Compression;
use crate::format::header::write_preamble;
use crate::format::{BlocksInfo, BundleHeader, DirectoryEntry, flags};
use crate::{Error, Result};

/// Builds an uncompressed UnityFS bundle in memory.
///
/// Entries are laid out contiguously in insertion order.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    header: BundleHeader,
    entries: Vec<(DirectoryEntry, Vec<u8>)>,
}

impl BundleBuilder {
    /// Creates a builder for format version 7 with the given engine revision.
    pub fn new(unity_revision: impl Into<String>) -> Self {
        Self {
            header: BundleHeader {
                format_version: 7,
                unity_version: "5.x.x".into(),
                unity_revision: unity_revision.into(),
                size: 0,
                compressed_blocks_info_size: 0,
                uncompressed_blocks_info_size: 0,
                flags: flags::HAS_DIRECTORY_INFO,
            },
            entries: Vec::new(),
        }
    }

    /// Sets the bundle format version.
    pub fn format_version(mut self, version: u32) -> Self {
        self.header.format_version = version;
        self
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerParse`] if an entry with this name exists.
    pub fn add_entry(&mut self, name: impl Into<String>, flags: u32, data: Vec<u8>) -> Result<()> {
        let name = name.into();
        if self.entries.iter().any(|(e, _)| e.name == name) {
            return Err(Error::container(0, format!("duplicate entry name '{}'", name)));
        }
        let offset = self
            .entries
            .last()
            .map(|(e, _)| e.offset + e.size)
            .unwrap_or(0);
        self.entries.push((
            DirectoryEntry {
                offset,
                size: data.len() as u64,
                flags,
                name,
            },
            data,
        ));
        Ok(())
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries were added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the bundle to `out` and returns the number of bytes written.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64> {
        let data_size: u64 = self.entries.iter().map(|(e, _)| e.size).sum();
        let info = BlocksInfo {
            hash: [0; 16],
            blocks: BlocksInfo::uncompressed_blocks(data_size),
            entries: self.entries.iter().map(|(e, _)| e.clone()).collect(),
        };
        let header_size = write_preamble(out, &self.header, &info, Compression::None)?;
        for (_, data) in &self.entries {
            out.write_all(data)?;
        }
        Ok(header_size + data_size)
    }

    /// Returns the bundle bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::Bundle;
    use std::io::Cursor;

    #[test]
    fn test_build_and_open() {
        let mut builder = BundleBuilder::new("2022.3.10f1");
        builder.add_entry("CAB-x", 4, b"assets".to_vec()).unwrap();
        builder.add_entry("CAB-x.resS", 0, b"stream".to_vec()).unwrap();
        assert_eq!(builder.len(), 2);

        let bytes = builder.build().unwrap();
        let mut bundle = Bundle::open(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(bundle.header().size as usize, bytes.len());
        assert_eq!(bundle.entries()[1].offset, 6);
        assert!(bundle.entries()[0].is_serialized_file());
        assert_eq!(bundle.read_entry("CAB-x.resS").unwrap(), b"stream");
    }

    #[test]
    fn test_format_version_6_has_no_alignment() {
        let mut builder = BundleBuilder::new("2017.4.0f1").format_version(6);
        builder.add_entry("CAB-y", 4, vec![1, 2, 3]).unwrap();
        let mut bundle = Bundle::open(Cursor::new(builder.build().unwrap())).unwrap();
        assert_eq!(bundle.header().format_version, 6);
        assert_eq!(bundle.read_entry("CAB-y").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let mut builder = BundleBuilder::new("2022.3.10f1");
        builder.add_entry("CAB-x", 4, Vec::new()).unwrap();
        assert!(builder.add_entry("CAB-x", 0, Vec::new()).is_err());
    }
}
