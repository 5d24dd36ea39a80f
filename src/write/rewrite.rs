//! Entry-level rewrite of a decompressed bundle.

use std::io::{Read, Seek, Write};

use super::WriteResult;
use crate::codec::Compression;
use crate::edit::{Replacer, ReplacerSet};
use crate::format::header::write_preamble;
use crate::format::{BlocksInfo, DirectoryEntry};
use crate::read::Bundle;
use crate::{Error, Result};

/// Writes `bundle` to `out` with entries replaced per `replacers`.
///
/// Entries keep their names, flags and directory order; offsets are
/// reassigned contiguously and sizes reflect the bytes actually produced.
/// Entries without a replacer are copied byte for byte. The output is
/// uncompressed and keeps the header's format version and version strings.
///
/// # Errors
///
/// - [`Error::CompressedBundle`] if `bundle` is not decompressed;
/// - [`Error::EntryNotFound`] if a replacer names an entry the bundle lacks;
/// - [`Error::WriteFailure`] if a file region is shorter than declared.
pub fn write_bundle<R, W>(
    bundle: &mut Bundle<R>,
    replacers: &ReplacerSet<String>,
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
    if let Some(name) = replacers.keys().find(|name| !bundle.contains(name)) {
        return Err(Error::EntryNotFound { name: name.clone() });
    }

    let originals: Vec<DirectoryEntry> = bundle.entries().to_vec();
    let mut entries = Vec::with_capacity(originals.len());
    let mut offset = 0u64;
    for original in &originals {
        let size = replacers.resolve(&original.name).output_len(original.size);
        entries.push(DirectoryEntry {
            offset,
            size,
            flags: original.flags,
            name: original.name.clone(),
        });
        offset += size;
    }
    let data_size = offset;

    let info = BlocksInfo {
        hash: [0; 16],
        blocks: BlocksInfo::uncompressed_blocks(data_size),
        entries,
    };
    let header_size = write_preamble(out, bundle.header(), &info, Compression::None)?;

    let mut replaced = 0;
    for (original, entry) in originals.iter().zip(&info.entries) {
        let replacer = replacers.resolve(&original.name);
        if *replacer != Replacer::CopyOriginal {
            replaced += 1;
        }
        log::debug!(
            "Writing entry '{}' ({}, {} bytes)",
            entry.name,
            replacer.kind(),
            entry.size
        );
        let written = replacer.emit(bundle, original.offset, original.size, out)?;
        if written != entry.size {
            return Err(Error::container(
                entry.offset,
                format!(
                    "entry '{}' produced {} bytes, expected {}",
                    entry.name, written, entry.size
                ),
            ));
        }
    }

    Ok(WriteResult {
        entries_written: originals.len(),
        entries_replaced: replaced,
        data_size,
        total_size: header_size + data_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::RegionSource;
    use crate::write::BundleBuilder;
    use std::io::Cursor;

    fn sample() -> Bundle<Cursor<Vec<u8>>> {
        let mut builder = BundleBuilder::new("2020.3.48f1");
        builder.add_entry("CAB-one", 4, b"first entry".to_vec()).unwrap();
        builder.add_entry("CAB-one.resS", 0, vec![7u8; 64]).unwrap();
        builder.add_entry("CAB-two", 4, b"third".to_vec()).unwrap();
        Bundle::open(Cursor::new(builder.build().unwrap())).unwrap()
    }

    #[test]
    fn test_empty_set_reproduces_entries() {
        let mut bundle = sample();
        let mut out = Vec::new();
        let result = write_bundle(&mut bundle, &ReplacerSet::new(), &mut out).unwrap();
        assert_eq!(result.entries_written, 3);
        assert_eq!(result.entries_replaced, 0);
        assert_eq!(result.total_size as usize, out.len());

        let mut rewritten = Bundle::open(Cursor::new(out)).unwrap();
        assert_eq!(rewritten.entries(), bundle.entries());
        assert_eq!(rewritten.read_entry("CAB-two").unwrap(), b"third");
    }

    #[test]
    fn test_replacements_resize_and_keep_order() {
        let mut bundle = sample();
        let mut replacers = ReplacerSet::new();
        replacers
            .insert(
                "CAB-one".to_string(),
                Replacer::FromBuffer(b"a much longer first entry".to_vec()),
            )
            .unwrap();
        replacers
            .insert(
                "CAB-two".to_string(),
                Replacer::FromRegion {
                    source: RegionSource::Original,
                    offset: 0,
                    length: 5,
                },
            )
            .unwrap();

        let mut out = Vec::new();
        let result = write_bundle(&mut bundle, &replacers, &mut out).unwrap();
        assert_eq!(result.entries_replaced, 2);

        let mut rewritten = Bundle::open(Cursor::new(out)).unwrap();
        let names: Vec<&str> = rewritten.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["CAB-one", "CAB-one.resS", "CAB-two"]);
        assert_eq!(
            rewritten.read_entry("CAB-one").unwrap(),
            b"a much longer first entry"
        );
        assert_eq!(rewritten.read_entry("CAB-one.resS").unwrap(), vec![7u8; 64]);
        assert_eq!(rewritten.read_entry("CAB-two").unwrap(), b"first");
        assert_eq!(rewritten.header().unity_revision, "2020.3.48f1");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut bundle = sample();
        let mut replacers = ReplacerSet::new();
        replacers
            .insert("CAB-missing".to_string(), Replacer::FromBuffer(Vec::new()))
            .unwrap();
        let err = write_bundle(&mut bundle, &replacers, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::EntryNotFound { ref name } if name == "CAB-missing"));
    }
}
