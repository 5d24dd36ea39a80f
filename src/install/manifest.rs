//! The patch manifest.
//!
//! A patch package is a JSON document listing the files it changes. Source
//! paths inside it are relative to the manifest's directory; target paths
//! are relative to the install root.
//!
//! ```json
//! {
//!   "name": "Translation",
//!   "creators": "someone",
//!   "description": "Replaces UI strings",
//!   "affected_files": [
//!     {
//!       "path": "StreamingAssets/ui.bundle",
//!       "is_container": true,
//!       "replacers": [
//!         { "kind": "entry", "name": "CAB-1.resS", "source": "files/CAB-1.resS" },
//!         { "kind": "entry_objects", "name": "CAB-1",
//!           "objects": [{ "path_id": -77, "source": "objects/hud.bin" }] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A patch package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchManifest {
    /// Patch name.
    pub name: String,
    /// Patch authors.
    #[serde(default)]
    pub creators: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Files to change, in install order.
    pub affected_files: Vec<AffectedFile>,
}

/// One file changed by a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedFile {
    /// Target path relative to the install root.
    pub path: PathBuf,
    /// `true` for bundles, `false` for plain serialized files.
    #[serde(default)]
    pub is_container: bool,
    /// Changes to apply.
    #[serde(default)]
    pub replacers: Vec<ReplacerDescriptor>,
    /// Types to add to the file's type table; recorded but not applied.
    #[serde(default)]
    pub added_types: Vec<AddedTypeDescriptor>,
}

/// One change within an affected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplacerDescriptor {
    /// Replace a bundle entry with the contents of a file.
    Entry {
        /// Entry name.
        name: String,
        /// Replacement file.
        source: PathBuf,
    },
    /// Replace a bundle entry with the original contents of another entry.
    CopyEntry {
        /// Entry name.
        name: String,
        /// Entry to copy from.
        from: String,
    },
    /// Patch objects inside a serialized-file entry of a bundle.
    EntryObjects {
        /// Entry name.
        name: String,
        /// Object replacements.
        objects: Vec<ObjectSource>,
    },
    /// Replace an object of a plain serialized file.
    Object {
        /// Object path id.
        path_id: i64,
        /// Replacement object bytes.
        source: PathBuf,
    },
}

impl ReplacerDescriptor {
    /// Whether this change applies to bundles.
    pub fn targets_container(&self) -> bool {
        !matches!(self, ReplacerDescriptor::Object { .. })
    }
}

/// New bytes for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSource {
    /// Object path id.
    pub path_id: i64,
    /// Replacement object bytes.
    pub source: PathBuf,
}

/// A type the patch would add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedTypeDescriptor {
    /// Engine class id.
    pub class_id: i32,
    /// Script type index for `MonoBehaviour` types.
    #[serde(default)]
    pub script_index: Option<i16>,
}

impl PatchManifest {
    /// Reads and validates a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if the file does not exist and
    /// [`Error::InvalidManifest`] if it does not decode or validate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        crate::fs::require_file(path)?;
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Decodes and validates a manifest.
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: Self =
            serde_json::from_str(text).map_err(|e| Error::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Renders the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidManifest(e.to_string()))
    }

    /// Checks that targets are relative, unique and that every change fits
    /// its target kind.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for file in &self.affected_files {
            let shown = file.path.display();
            if !is_relative_inside(&file.path) {
                return Err(Error::InvalidManifest(format!(
                    "target {} must be a relative path inside the root",
                    shown
                )));
            }
            if !seen.insert(&file.path) {
                return Err(Error::InvalidManifest(format!("target {} listed twice", shown)));
            }
            if let Some(bad) = file
                .replacers
                .iter()
                .find(|r| r.targets_container() != file.is_container)
            {
                return Err(Error::InvalidManifest(format!(
                    "{:?} does not apply to {} target {}",
                    bad,
                    if file.is_container { "bundle" } else { "serialized file" },
                    shown
                )));
            }
        }
        Ok(())
    }
}

fn is_relative_inside(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
