//! Assembly of new serialized files.

use super::serialized::{ExternalRef, LARGE_FILES_VERSION, ScriptRef};
use super::type_tree::TypeTree;
use crate::format::align_up;
use crate::format::reader::ByteWriter;
use crate::{Error, Result};

/// Alignment of the data region and of each object within it.
const DATA_ALIGNMENT: u64 = 16;
const OBJECT_ALIGNMENT: u64 = 8;

struct PendingType {
    class_id: i32,
    script_type_index: i16,
    tree: Option<TypeTree>,
}

struct PendingObject {
    path_id: i64,
    type_index: i32,
    data: Vec<u8>,
}

/// Builds a serialized file of version 17 or later.
///
/// Type trees are embedded when every added type carries one.
pub struct SerializedFileBuilder {
    version: u32,
    big_endian: bool,
    unity_version: String,
    target_platform: i32,
    types: Vec<PendingType>,
    objects: Vec<PendingObject>,
    scripts: Vec<ScriptRef>,
    externals: Vec<ExternalRef>,
}

impl SerializedFileBuilder {
    /// Creates a little-endian builder for `version`.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            big_endian: false,
            unity_version: "2021.3.16f1".into(),
            target_platform: 19,
            types: Vec::new(),
            objects: Vec::new(),
            scripts: Vec::new(),
            externals: Vec::new(),
        }
    }

    /// Sets the byte order of metadata and objects.
    pub fn big_endian(mut self, big_endian: bool) -> Self {
        self.big_endian = big_endian;
        self
    }

    /// Sets the engine version string.
    pub fn unity_version(mut self, version: impl Into<String>) -> Self {
        self.unity_version = version.into();
        self
    }

    /// Declares a type and returns its index for [`add_object`](Self::add_object).
    pub fn add_type(&mut self, class_id: i32, tree: Option<TypeTree>) -> i32 {
        self.types.push(PendingType {
            class_id,
            script_type_index: -1,
            tree,
        });
        self.types.len() as i32 - 1
    }

    /// Declares a script type bound to entry `script_index` of the script table.
    pub fn add_script_type(&mut self, script_index: i16, tree: Option<TypeTree>) -> i32 {
        self.types.push(PendingType {
            class_id: 114,
            script_type_index: script_index,
            tree,
        });
        self.types.len() as i32 - 1
    }

    /// Appends an object of type `type_index`.
    pub fn add_object(&mut self, path_id: i64, type_index: i32, data: Vec<u8>) {
        self.objects.push(PendingObject {
            path_id,
            type_index,
            data,
        });
    }

    /// Appends a script table entry.
    pub fn add_script(&mut self, file_index: i32, path_id: i64) {
        self.scripts.push(ScriptRef {
            file_index,
            path_id,
        });
    }

    /// Appends an external reference; the first one is file id 1.
    pub fn add_external(&mut self, path: impl Into<String>) {
        self.externals.push(ExternalRef {
            guid: [0; 16],
            kind: 0,
            path: path.into(),
        });
    }

    /// Returns the file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] for versions before 17.
    pub fn build(&self) -> Result<Vec<u8>> {
        let version = self.version;
        if version < 17 {
            return Err(Error::UnsupportedVersion { version });
        }
        let header_len: usize = if version >= LARGE_FILES_VERSION { 48 } else { 20 };
        let with_trees = !self.types.is_empty() && self.types.iter().all(|t| t.tree.is_some());

        let mut meta = ByteWriter::with_base(self.big_endian, header_len);
        meta.write_cstring(&self.unity_version);
        meta.write_i32(self.target_platform);
        meta.write_bool(with_trees);

        meta.write_i32(self.types.len() as i32);
        for t in &self.types {
            meta.write_i32(t.class_id);
            meta.write_bool(false);
            meta.write_i16(t.script_type_index);
            if t.class_id == 114 {
                meta.write_bytes(&[0u8; 16]);
            }
            meta.write_bytes(&[0u8; 16]);
            if with_trees {
                if let Some(tree) = &t.tree {
                    tree.encode(&mut meta, version);
                }
                if version >= 21 {
                    meta.write_i32(0);
                }
            }
        }

        let mut starts = Vec::with_capacity(self.objects.len());
        let mut cursor = 0u64;
        for object in &self.objects {
            let start = align_up(cursor, OBJECT_ALIGNMENT);
            starts.push(start);
            cursor = start + object.data.len() as u64;
        }

        meta.write_i32(self.objects.len() as i32);
        for (object, start) in self.objects.iter().zip(&starts) {
            meta.align(4);
            meta.write_i64(object.path_id);
            if version >= LARGE_FILES_VERSION {
                meta.write_i64(*start as i64);
            } else {
                meta.write_u32(*start as u32);
            }
            meta.write_u32(object.data.len() as u32);
            meta.write_i32(object.type_index);
        }

        meta.write_i32(self.scripts.len() as i32);
        for script in &self.scripts {
            meta.write_i32(script.file_index);
            meta.align(4);
            meta.write_i64(script.path_id);
        }

        meta.write_i32(self.externals.len() as i32);
        for external in &self.externals {
            meta.write_cstring("");
            meta.write_bytes(&external.guid);
            meta.write_i32(external.kind);
            meta.write_cstring(&external.path);
        }
        if version >= 20 {
            meta.write_i32(0);
        }
        meta.write_cstring("");

        let metadata = meta.into_inner();
        let data_offset = align_up((header_len + metadata.len()) as u64, DATA_ALIGNMENT);
        let file_size = data_offset + cursor;

        let mut out = ByteWriter::new(true);
        if version >= LARGE_FILES_VERSION {
            out.write_u32(0);
            out.write_u32(0);
            out.write_u32(version);
            out.write_u32(0);
            out.write_bool(self.big_endian);
            out.write_bytes(&[0; 3]);
            out.write_u32(metadata.len() as u32);
            out.write_i64(file_size as i64);
            out.write_i64(data_offset as i64);
            out.write_i64(0);
        } else {
            out.write_u32(metadata.len() as u32);
            out.write_u32(file_size as u32);
            out.write_u32(version);
            out.write_u32(data_offset as u32);
            out.write_bool(self.big_endian);
            out.write_bytes(&[0; 3]);
        }
        let mut bytes = out.into_inner();
        bytes.extend_from_slice(&metadata);
        bytes.resize(data_offset as usize, 0);
        for (object, start) in self.objects.iter().zip(&starts) {
            bytes.resize((data_offset + start) as usize, 0);
            bytes.extend_from_slice(&object.data);
        }
        Ok(bytes)
    }
}
