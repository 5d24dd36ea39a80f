//! Object-level rewrite of serialized files.

use std::io::Write;

use super::serialized::{LARGE_FILES_VERSION, ObjectInfo, SerializedFile};
use crate::edit::{OriginalData, Replacer, ReplacerSet};
use crate::format::align_up;
use crate::format::reader::ByteWriter;
use crate::{Error, Result};

/// Objects start on 8-byte boundaries within the data region.
const OBJECT_ALIGNMENT: u64 = 8;

/// The object data region of a parsed file.
struct DataRegion<'a>(&'a [u8]);

impl OriginalData for DataRegion<'_> {
    fn copy_original(&mut self, offset: u64, len: u64, out: &mut dyn Write) -> Result<u64> {
        let end = offset.checked_add(len);
        match end {
            Some(end) if end <= self.0.len() as u64 => {
                out.write_all(&self.0[offset as usize..end as usize])?;
                Ok(len)
            }
            _ => Err(Error::assets(
                offset,
                format!(
                    "region of {} bytes outside data region of {}",
                    len,
                    self.0.len()
                ),
            )),
        }
    }
}

impl SerializedFile {
    /// Writes this file to `out` with objects replaced per `replacers`.
    ///
    /// The metadata is copied verbatim except for the object table, which is
    /// re-encoded with new offsets and sizes; the metadata size is therefore
    /// unchanged. Objects are laid out in table order, each aligned to 8
    /// bytes from the data offset. Returns the new file size.
    ///
    /// # Errors
    ///
    /// - [`Error::ObjectNotFound`] if a replacer names an unknown path id;
    /// - [`Error::AssetsParse`] if the result does not fit the format
    ///   version's 32-bit fields;
    /// - [`Error::WriteFailure`] if a file region is shorter than declared.
    pub fn write_with<W: Write>(&self, replacers: &ReplacerSet<i64>, out: &mut W) -> Result<u64> {
        if let Some(&path_id) = replacers.keys().find(|id| self.object(**id).is_none()) {
            return Err(Error::ObjectNotFound { path_id });
        }

        let version = self.header.version;
        let mut layout = Vec::with_capacity(self.objects.len());
        let mut cursor = 0u64;
        for object in &self.objects {
            let start = align_up(cursor, OBJECT_ALIGNMENT);
            let size = replacers
                .resolve(&object.path_id)
                .output_len(u64::from(object.byte_size));
            let byte_size = u32::try_from(size).map_err(|_| {
                Error::assets(
                    start,
                    format!("object {} is larger than 4 GiB", object.path_id),
                )
            })?;
            layout.push(ObjectInfo {
                byte_start: start,
                byte_size,
                ..object.clone()
            });
            cursor = start + size;
        }

        let data_offset = self.header.data_offset;
        let file_size = data_offset + cursor;
        if version < LARGE_FILES_VERSION && file_size > u64::from(u32::MAX) {
            return Err(Error::assets(
                0,
                format!(
                    "file of {} bytes exceeds the 32-bit limit of version {}",
                    file_size, version
                ),
            ));
        }

        let table = self.encode_object_table(&layout);
        debug_assert_eq!(table.len(), self.object_table.len());

        let mut prefix = self.data[..self.object_table.start].to_vec();
        if version >= LARGE_FILES_VERSION {
            prefix[24..32].copy_from_slice(&(file_size as i64).to_be_bytes());
        } else {
            prefix[4..8].copy_from_slice(&(file_size as u32).to_be_bytes());
        }
        out.write_all(&prefix)?;
        out.write_all(&table)?;
        out.write_all(&self.data[self.object_table.end..data_offset as usize])?;

        let mut region = DataRegion(self.data_region());
        let mut written = 0u64;
        for (original, placed) in self.objects.iter().zip(&layout) {
            let padding = placed.byte_start - written;
            out.write_all(&vec![0u8; padding as usize])?;
            let replacer = replacers.resolve(&original.path_id);
            if *replacer != Replacer::CopyOriginal {
                log::debug!(
                    "Replacing object {} ({}, {} bytes)",
                    original.path_id,
                    replacer.kind(),
                    placed.byte_size
                );
            }
            let n = replacer.emit(
                &mut region,
                original.byte_start,
                u64::from(original.byte_size),
                out,
            )?;
            written = placed.byte_start + n;
        }
        Ok(file_size)
    }

    /// Returns the rewritten file as a buffer.
    pub fn to_bytes_with(&self, replacers: &ReplacerSet<i64>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.data.len());
        self.write_with(replacers, &mut out)?;
        Ok(out)
    }

    fn encode_object_table(&self, objects: &[ObjectInfo]) -> Vec<u8> {
        let version = self.header.version;
        let mut w = ByteWriter::with_base(self.header.big_endian, self.object_table.start);
        w.write_i32(objects.len() as i32);
        for object in objects {
            w.align(4);
            w.write_i64(object.path_id);
            if version >= LARGE_FILES_VERSION {
                w.write_i64(object.byte_start as i64);
            } else {
                w.write_u32(object.byte_start as u32);
            }
            w.write_u32(object.byte_size);
            w.write_i32(object.type_id);
            if version < 16 {
                w.write_u16(object.legacy_class_id);
            }
            if version < 17 {
                w.write_i16(object.legacy_script_index);
            }
            if version == 15 || version == 16 {
                w.write_u8(object.legacy_stripped);
            }
        }
        w.into_inner()
    }
}
