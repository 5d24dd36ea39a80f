//! The workspace index.
//!
//! A [`Workspace`] holds the serialized files taking part in one operation
//! and indexes every object by `(file id, path id)`, where the file id is
//! the position of the file in the workspace. Each object carries its class,
//! a display name and, when a bundle listing names it, its container path.
//!
//! Changes are recorded as replacers per object; [`Workspace::write_file`]
//! produces the rewritten bytes of a changed file.

mod container;
mod names;

pub use names::MAX_NAME_LEN;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::assets::SerializedFile;
use crate::edit::{Replacer, ReplacerSet};
use crate::typetree::{ObjectSerializer, TypeInfo};
use crate::{Error, Result};

/// Key of an object in a workspace: `(file id, path id)`.
pub type ObjectKey = (usize, i64);

/// A serialized file loaded into a workspace.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// The name other files use to reference this one (a bundle entry name
    /// or a file name).
    pub name: String,
    /// Where the file's bytes live on disk.
    pub path: PathBuf,
    /// Prefix of this file's dump names.
    pub stem: String,
    /// The parsed file.
    pub file: SerializedFile,
}

impl LoadedFile {
    /// Reads and parses the serialized file at `path`.
    pub fn load(name: impl Into<String>, path: impl AsRef<Path>, stem: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            name: name.into(),
            path: path.to_path_buf(),
            stem: stem.into(),
            file: SerializedFile::open_path(path)?,
        })
    }

    /// Parses a serialized file already held in memory. `path` records where
    /// the bytes came from.
    pub fn from_bytes(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        stem: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            stem: stem.into(),
            file: SerializedFile::parse(data)?,
        })
    }
}

/// One indexed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Position of the owning file in the workspace.
    pub file_id: usize,
    /// Object identifier within its file.
    pub path_id: i64,
    /// Engine class id.
    pub class_id: i32,
    /// Class name.
    pub class_name: String,
    /// Human-readable name, at most [`MAX_NAME_LEN`] characters.
    pub display_name: String,
    /// Path from the bundle listing, if listed.
    pub container_path: Option<String>,
    /// Size of the object bytes.
    pub byte_size: u32,
}

/// Loaded files plus the object index and pending changes.
pub struct Workspace {
    files: Vec<LoadedFile>,
    objects: BTreeMap<ObjectKey, ObjectEntry>,
    changes: BTreeMap<usize, ReplacerSet<i64>>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("files", &self.files.len())
            .field("objects", &self.objects.len())
            .field("changed_files", &self.changes.len())
            .finish()
    }
}

impl Workspace {
    /// Indexes every object of `files`.
    ///
    /// Objects that cannot be decoded are still indexed, named after their
    /// class. A missing container listing is not an error.
    pub fn from_files(files: Vec<LoadedFile>, serializer: &dyn ObjectSerializer) -> Self {
        let listing = container::collect(&files, serializer);
        let mut objects = BTreeMap::new();
        for (file_id, loaded) in files.iter().enumerate() {
            let lowered = loaded.name.to_lowercase();
            for object in &loaded.file.objects {
                let class_name = names::class_name(loaded, object);
                let display_name =
                    names::display_name(&files, file_id, object, &class_name, serializer);
                let container_path = listing.get(&(lowered.clone(), object.path_id)).cloned();
                objects.insert(
                    (file_id, object.path_id),
                    ObjectEntry {
                        file_id,
                        path_id: object.path_id,
                        class_id: object.class_id,
                        class_name,
                        display_name,
                        container_path,
                        byte_size: object.byte_size,
                    },
                );
            }
        }
        log::debug!(
            "Indexed {} objects in {} files ({} listed)",
            objects.len(),
            files.len(),
            listing.len()
        );
        Self {
            files,
            objects,
            changes: BTreeMap::new(),
        }
    }

    /// The loaded files; a file's id is its index.
    pub fn files(&self) -> &[LoadedFile] {
        &self.files
    }

    /// The file with id `file_id`.
    pub fn file(&self, file_id: usize) -> Option<&LoadedFile> {
        self.files.get(file_id)
    }

    /// Id of the file called `name`, compared case-insensitively.
    pub fn file_id(&self, name: &str) -> Option<usize> {
        self.files
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// All objects ordered by key.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectEntry> {
        self.objects.values()
    }

    /// Objects of one file ordered by path id.
    pub fn objects_in(&self, file_id: usize) -> impl Iterator<Item = &ObjectEntry> {
        self.objects
            .range((file_id, i64::MIN)..=(file_id, i64::MAX))
            .map(|(_, entry)| entry)
    }

    /// Looks up an object.
    pub fn object(&self, key: ObjectKey) -> Option<&ObjectEntry> {
        self.objects.get(&key)
    }

    /// The bytes of an object as loaded.
    pub fn object_data(&self, key: ObjectKey) -> Option<&[u8]> {
        let file = &self.files.get(key.0)?.file;
        file.object(key.1).map(|o| file.object_data(o))
    }

    /// Serializer input for an object.
    pub fn type_info(&self, key: ObjectKey) -> Result<TypeInfo<'_>> {
        let loaded = self
            .files
            .get(key.0)
            .ok_or(Error::ObjectNotFound { path_id: key.1 })?;
        TypeInfo::for_object(&loaded.file, key.1)
    }

    /// Records new content for an object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`] for an unknown key and
    /// [`Error::DuplicateReplacer`] if the object already changed.
    pub fn add_replacer(&mut self, key: ObjectKey, replacer: Replacer) -> Result<()> {
        if !self.objects.contains_key(&key) {
            return Err(Error::ObjectNotFound { path_id: key.1 });
        }
        self.changes
            .entry(key.0)
            .or_default()
            .insert(key.1, replacer)
    }

    /// Returns `true` if the object has a replacer.
    pub fn is_changed(&self, key: ObjectKey) -> bool {
        self.changes
            .get(&key.0)
            .is_some_and(|set| set.contains_key(&key.1))
    }

    /// Ids of files with at least one changed object.
    pub fn changed_files(&self) -> Vec<usize> {
        self.changes
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Writes file `file_id` with its changes applied; returns the new size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] if no such file exists.
    pub fn write_file<W: Write>(&self, file_id: usize, out: &mut W) -> Result<u64> {
        let loaded = self.files.get(file_id).ok_or_else(|| Error::EntryNotFound {
            name: format!("file #{}", file_id),
        })?;
        match self.changes.get(&file_id) {
            Some(set) => loaded.file.write_with(set, out),
            None => loaded.file.write_with(&ReplacerSet::new(), out),
        }
    }
}
