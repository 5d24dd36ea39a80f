//! Serialized file parsing.

use std::ops::Range;
use std::path::Path;

use super::type_tree::TypeTree;
use crate::format::reader::ByteReader;
use crate::{Error, Result};

/// Oldest supported serialized file version.
pub const MIN_VERSION: u32 = 14;

/// First version with the 48-byte header and 64-bit offsets.
pub const LARGE_FILES_VERSION: u32 = 22;

/// Class id of `MonoBehaviour`.
const MONO_BEHAVIOUR: i32 = 114;

/// The fixed header of a serialized file.
///
/// The header itself is always big-endian; `big_endian` applies to the
/// metadata and object data that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializedHeader {
    /// Size of the metadata following the header.
    pub metadata_size: u32,
    /// Total file size.
    pub file_size: u64,
    /// Format version.
    pub version: u32,
    /// Absolute offset of the object data region.
    pub data_offset: u64,
    /// Byte order of metadata and objects.
    pub big_endian: bool,
}

impl SerializedHeader {
    /// Encoded size of the header for this version.
    pub fn encoded_len(&self) -> usize {
        if self.version >= LARGE_FILES_VERSION {
            48
        } else {
            20
        }
    }
}

/// A type declared in the metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedType {
    /// Engine class id.
    pub class_id: i32,
    /// Stripped-type marker (version 16+).
    pub is_stripped: bool,
    /// Index into the script table for script types, or -1 (version 17+).
    pub script_type_index: i16,
    /// Script hash, present for script types.
    pub script_id: Option<[u8; 16]>,
    /// Type hash.
    pub old_type_hash: [u8; 16],
    /// The embedded type tree, when type trees are enabled.
    pub type_tree: Option<TypeTree>,
}

/// One row of the object table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object identifier, unique within the file.
    pub path_id: i64,
    /// Offset of the object bytes relative to the data region.
    pub byte_start: u64,
    /// Size of the object bytes.
    pub byte_size: u32,
    /// Index into the type table (a class id before version 16).
    pub type_id: i32,
    /// Resolved engine class id.
    pub class_id: i32,
    /// Stored class id (before version 16).
    pub legacy_class_id: u16,
    /// Stored script index (versions 14-16).
    pub legacy_script_index: i16,
    /// Stored stripped marker (versions 15 and 16).
    pub legacy_stripped: u8,
}

/// A reference to another file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRef {
    /// Asset GUID.
    pub guid: [u8; 16],
    /// Reference kind.
    pub kind: i32,
    /// Path of the referenced file, e.g. `archive:/CAB-xyz/CAB-xyz`.
    pub path: String,
}

impl ExternalRef {
    /// The last path component, which is how files name each other.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

/// A script reference from the script table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRef {
    /// File index of the script.
    pub file_index: i32,
    /// Path id of the script object.
    pub path_id: i64,
}

/// A parsed serialized file, holding its bytes.
#[derive(Debug, Clone)]
pub struct SerializedFile {
    /// The header.
    pub header: SerializedHeader,
    /// Engine version that wrote the file.
    pub unity_version: String,
    /// Target platform id.
    pub target_platform: i32,
    /// Whether type trees are embedded.
    pub enable_type_tree: bool,
    /// The type table.
    pub types: Vec<SerializedType>,
    /// The object table in file order.
    pub objects: Vec<ObjectInfo>,
    /// The script table.
    pub scripts: Vec<ScriptRef>,
    /// External file references; file id `n` refers to `externals[n - 1]`.
    pub externals: Vec<ExternalRef>,
    pub(crate) data: Vec<u8>,
    pub(crate) object_table: Range<usize>,
}

impl SerializedFile {
    /// Parses a serialized file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] for versions before 14 and
    /// [`Error::AssetsParse`] for malformed metadata or objects outside the
    /// data region.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let header = read_header(&data)?;
        if header.version < MIN_VERSION {
            return Err(Error::UnsupportedVersion {
                version: header.version,
            });
        }
        let version = header.version;
        let metadata_end = header.encoded_len() + header.metadata_size as usize;
        if metadata_end > data.len() || header.data_offset > data.len() as u64 {
            return Err(Error::assets(
                0,
                format!(
                    "metadata ({} bytes) or data offset {} past end of file ({} bytes)",
                    metadata_end,
                    header.data_offset,
                    data.len()
                ),
            ));
        }
        if header.data_offset < metadata_end as u64 {
            return Err(Error::assets(
                0,
                format!(
                    "data offset {} inside metadata ending at {}",
                    header.data_offset, metadata_end
                ),
            ));
        }

        let mut r = ByteReader::new(&data, header.big_endian);
        r.set_position(header.encoded_len())?;
        let parsed = (|| -> Result<_> {
            let unity_version = r.read_cstring()?;
            let target_platform = r.read_i32()?;
            let enable_type_tree = r.read_bool()?;

            let type_count = read_count(&mut r, 4, "type")?;
            let mut types = Vec::with_capacity(type_count);
            for _ in 0..type_count {
                types.push(read_type(&mut r, version, enable_type_tree)?);
            }

            let table_start = r.position();
            let object_count = read_count(&mut r, 20, "object")?;
            let mut objects = Vec::with_capacity(object_count);
            for _ in 0..object_count {
                objects.push(read_object(&mut r, version, &types)?);
            }
            let table_end = r.position();

            let script_count = read_count(&mut r, 12, "script")?;
            let mut scripts = Vec::with_capacity(script_count);
            for _ in 0..script_count {
                let file_index = r.read_i32()?;
                r.align(4)?;
                scripts.push(ScriptRef {
                    file_index,
                    path_id: r.read_i64()?,
                });
            }

            let external_count = read_count(&mut r, 22, "external")?;
            let mut externals = Vec::with_capacity(external_count);
            for _ in 0..external_count {
                r.read_cstring()?;
                let mut guid = [0u8; 16];
                guid.copy_from_slice(r.read_bytes(16)?);
                externals.push(ExternalRef {
                    guid,
                    kind: r.read_i32()?,
                    path: r.read_cstring()?,
                });
            }

            Ok((
                unity_version,
                target_platform,
                enable_type_tree,
                types,
                objects,
                table_start..table_end,
                scripts,
                externals,
            ))
        })()
        .map_err(reframe)?;
        let (
            unity_version,
            target_platform,
            enable_type_tree,
            types,
            objects,
            object_table,
            scripts,
            externals,
        ) = parsed;

        if object_table.end > metadata_end {
            return Err(Error::assets(
                object_table.end as u64,
                "object table extends past metadata",
            ));
        }

        let file = Self {
            header,
            unity_version,
            target_platform,
            enable_type_tree,
            types,
            objects,
            scripts,
            externals,
            data,
            object_table,
        };
        file.validate_objects()?;
        log::debug!(
            "Parsed serialized file v{} ({} types, {} objects, {} externals)",
            version,
            file.types.len(),
            file.objects.len(),
            file.externals.len()
        );
        Ok(file)
    }

    /// Reads and parses a file from disk.
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
        Self::parse(std::fs::read(path)?)
    }

    fn validate_objects(&self) -> Result<()> {
        let region = self.data.len() as u64 - self.header.data_offset;
        let mut seen = std::collections::HashSet::with_capacity(self.objects.len());
        for object in &self.objects {
            if !seen.insert(object.path_id) {
                return Err(Error::assets(
                    self.object_table.start as u64,
                    format!("duplicate path id {}", object.path_id),
                ));
            }
            let end = object.byte_start.checked_add(u64::from(object.byte_size));
            if end.is_none_or(|end| end > region) {
                return Err(Error::assets(
                    self.header.data_offset + object.byte_start,
                    format!(
                        "object {} ({}+{}) outside data region of {} bytes",
                        object.path_id, object.byte_start, object.byte_size, region
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Format version.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Whether metadata and objects are big-endian.
    pub fn big_endian(&self) -> bool {
        self.header.big_endian
    }

    /// The whole file as parsed.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Looks up an object by path id.
    pub fn object(&self, path_id: i64) -> Option<&ObjectInfo> {
        self.objects.iter().find(|o| o.path_id == path_id)
    }

    /// The bytes of an object.
    pub fn object_data(&self, object: &ObjectInfo) -> &[u8] {
        let start = (self.header.data_offset + object.byte_start) as usize;
        &self.data[start..start + object.byte_size as usize]
    }

    /// The declared type of an object.
    pub fn type_of(&self, object: &ObjectInfo) -> Option<&SerializedType> {
        if self.header.version >= 16 {
            usize::try_from(object.type_id)
                .ok()
                .and_then(|i| self.types.get(i))
        } else {
            self.types.iter().find(|t| t.class_id == object.type_id)
        }
    }

    /// The type tree of an object, if embedded.
    pub fn type_tree_of(&self, object: &ObjectInfo) -> Option<&TypeTree> {
        self.type_of(object).and_then(|t| t.type_tree.as_ref())
    }

    /// The file name a file id refers to; `None` for id 0 (this file) or an
    /// out-of-range id.
    pub fn external_file_name(&self, file_id: i32) -> Option<&str> {
        let index = usize::try_from(file_id).ok()?.checked_sub(1)?;
        self.externals.get(index).map(ExternalRef::file_name)
    }

    /// The data region.
    pub(crate) fn data_region(&self) -> &[u8] {
        &self.data[self.header.data_offset as usize..]
    }
}

fn read_header(data: &[u8]) -> Result<SerializedHeader> {
    let mut r = ByteReader::new(data, true);
    let header = (|| -> Result<SerializedHeader> {
        let metadata_size = r.read_u32()?;
        let file_size = r.read_u32()?;
        let version = r.read_u32()?;
        let data_offset = r.read_u32()?;
        let big_endian = r.read_u8()? != 0;
        r.read_bytes(3)?;
        if version >= LARGE_FILES_VERSION {
            let metadata_size = r.read_u32()?;
            let file_size = r.read_i64()?;
            let data_offset = r.read_i64()?;
            r.read_i64()?;
            if file_size < 0 || data_offset < 0 {
                return Err(Error::assets(24, "negative file size or data offset"));
            }
            return Ok(SerializedHeader {
                metadata_size,
                file_size: file_size as u64,
                version,
                data_offset: data_offset as u64,
                big_endian,
            });
        }
        Ok(SerializedHeader {
            metadata_size,
            file_size: u64::from(file_size),
            version,
            data_offset: u64::from(data_offset),
            big_endian,
        })
    })();
    header.map_err(reframe)
}

fn read_type(r: &mut ByteReader<'_>, version: u32, enable_type_tree: bool) -> Result<SerializedType> {
    let class_id = r.read_i32()?;
    let is_stripped = if version >= 16 { r.read_bool()? } else { false };
    let script_type_index = if version >= 17 { r.read_i16()? } else { -1 };

    let is_script = if version < 16 {
        class_id < 0
    } else {
        class_id == MONO_BEHAVIOUR
    };
    let script_id = if is_script {
        let mut id = [0u8; 16];
        id.copy_from_slice(r.read_bytes(16)?);
        Some(id)
    } else {
        None
    };
    let mut old_type_hash = [0u8; 16];
    old_type_hash.copy_from_slice(r.read_bytes(16)?);

    let type_tree = if enable_type_tree {
        let tree = TypeTree::parse(r, version)?;
        if version >= 21 {
            let deps = read_count(r, 4, "type dependency")?;
            r.read_bytes(deps * 4)?;
        }
        Some(tree)
    } else {
        None
    };

    Ok(SerializedType {
        class_id,
        is_stripped,
        script_type_index,
        script_id,
        old_type_hash,
        type_tree,
    })
}

fn read_object(r: &mut ByteReader<'_>, version: u32, types: &[SerializedType]) -> Result<ObjectInfo> {
    r.align(4)?;
    let path_id = r.read_i64()?;
    let byte_start = if version >= LARGE_FILES_VERSION {
        let start = r.read_i64()?;
        if start < 0 {
            return Err(Error::assets(
                r.position() as u64 - 8,
                format!("negative byte start for object {}", path_id),
            ));
        }
        start as u64
    } else {
        u64::from(r.read_u32()?)
    };
    let byte_size = r.read_u32()?;
    let type_id = r.read_i32()?;
    let legacy_class_id = if version < 16 { r.read_u16()? } else { 0 };
    let legacy_script_index = if version < 17 { r.read_i16()? } else { -1 };
    let legacy_stripped = if version == 15 || version == 16 {
        r.read_u8()?
    } else {
        0
    };

    let class_id = if version >= 16 {
        usize::try_from(type_id)
            .ok()
            .and_then(|i| types.get(i))
            .map(|t| t.class_id)
            .ok_or_else(|| {
                Error::assets(
                    r.position() as u64,
                    format!("object {} has unknown type index {}", path_id, type_id),
                )
            })?
    } else {
        i32::from(legacy_class_id)
    };

    Ok(ObjectInfo {
        path_id,
        byte_start,
        byte_size,
        type_id,
        class_id,
        legacy_class_id,
        legacy_script_index,
        legacy_stripped,
    })
}

fn read_count(r: &mut ByteReader<'_>, record_size: usize, what: &str) -> Result<usize> {
    let at = r.position() as u64;
    let count = r.read_i32()?;
    if count < 0 || (count as usize).saturating_mul(record_size) > r.remaining() {
        return Err(Error::assets(at, format!("implausible {} count {}", what, count)));
    }
    Ok(count as usize)
}

fn reframe(e: Error) -> Error {
    match e {
        Error::Truncated { offset, needed } => Error::assets(
            offset,
            format!("metadata truncated ({} bytes missing)", needed),
        ),
        other => other,
    }
}
