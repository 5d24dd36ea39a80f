//! Matching dumps back to objects.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::{DumpFormat, DumpIdentity};
use crate::fs;
use crate::edit::Replacer;
use crate::typetree::ObjectSerializer;
use crate::workspace::{ObjectKey, Workspace};
use crate::{Error, Result};

/// What [`import_objects`] did with each dump it found.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    /// Dumps turned into replacers.
    pub applied: Vec<PathBuf>,
    /// Dumps that did not decode, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Dumps sharing an object with another dump; none of them is applied.
    pub ambiguous: Vec<PathBuf>,
    /// Dumps naming a path id that is not in their file.
    pub unmatched: Vec<PathBuf>,
}

/// Finds the dumps of every workspace file and records their contents as
/// object replacers.
///
/// A dump belongs to a file when it sits in the same directory and its name
/// is the file's stem followed by `-<token>-<pathId>.<ext>`. Decode failures
/// are logged and skipped.
///
/// # Errors
///
/// Returns an error only if a directory cannot be listed.
pub fn import_objects(
    workspace: &mut Workspace,
    serializer: &dyn ObjectSerializer,
) -> Result<ImportOutcome> {
    let mut outcome = ImportOutcome::default();
    let mut found: BTreeMap<ObjectKey, Vec<(PathBuf, DumpFormat)>> = BTreeMap::new();

    for (dir, names) in listings(workspace)? {
        for name in names {
            let Some((file_id, identity)) = claim(workspace, &dir, &name) else {
                continue;
            };
            found
                .entry((file_id, identity.path_id))
                .or_default()
                .push((dir.join(&name), identity.format));
        }
    }

    for (key, dumps) in found {
        if workspace.object(key).is_none() {
            for (path, _) in dumps {
                log::warn!("{} names no object in its file", path.display());
                outcome.unmatched.push(path);
            }
            continue;
        }
        if dumps.len() > 1 {
            for (path, _) in dumps {
                log::warn!("{} is one of several dumps for path id {}", path.display(), key.1);
                outcome.ambiguous.push(path);
            }
            continue;
        }
        let Some((path, format)) = dumps.into_iter().next() else {
            continue;
        };

        match decode(workspace, key, &path, format, serializer) {
            Ok(bytes) => {
                workspace.add_replacer(key, Replacer::FromBuffer(bytes))?;
                log::info!("Imported {}", path.display());
                outcome.applied.push(path);
            }
            Err(e) => {
                log::warn!("{}", e);
                outcome.failed.push((path, e.to_string()));
            }
        }
    }
    Ok(outcome)
}

/// Sorted file names of every directory holding a workspace file.
fn listings(workspace: &Workspace) -> Result<BTreeMap<PathBuf, BTreeSet<String>>> {
    let mut dirs = BTreeMap::new();
    for loaded in workspace.files() {
        let dir = fs::parent_of(&loaded.path);
        if dirs.contains_key(&dir) {
            continue;
        }
        let mut names = BTreeSet::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dirs.insert(dir, names);
    }
    Ok(dirs)
}

/// The file a dump name belongs to; the longest matching stem wins.
fn claim(workspace: &Workspace, dir: &Path, name: &str) -> Option<(usize, DumpIdentity)> {
    workspace
        .files()
        .iter()
        .enumerate()
        .filter(|(_, f)| fs::parent_of(&f.path) == dir)
        .filter_map(|(id, f)| DumpIdentity::parse(&f.stem, name).map(|identity| (id, identity)))
        .max_by_key(|(_, identity)| identity.stem.len())
}

fn decode(
    workspace: &Workspace,
    key: ObjectKey,
    path: &Path,
    format: DumpFormat,
    serializer: &dyn ObjectSerializer,
) -> Result<Vec<u8>> {
    let failed = |reason: String| Error::DumpDecode {
        path: path.to_path_buf(),
        reason,
    };
    let text = std::fs::read(path).map_err(|e| failed(e.to_string()))?;
    let text = String::from_utf8(text).map_err(|e| failed(e.to_string()))?;
    let info = workspace.type_info(key).map_err(|e| failed(e.to_string()))?;
    match format {
        DumpFormat::Text => serializer.from_text(&text, &info),
        DumpFormat::Json => serializer.from_json(&text, &info),
    }
    .map_err(|e| failed(e.to_string()))
}

/// Writes every changed workspace file through `~<name>` and renames it
/// over the original. Returns the rewritten paths.
pub fn commit_changes(workspace: &Workspace) -> Result<Vec<PathBuf>> {
    let mut rewritten = Vec::new();
    for file_id in workspace.changed_files() {
        let Some(loaded) = workspace.file(file_id) else {
            continue;
        };
        let staged = fs::parent_of(&loaded.path).join(format!("~{}", fs::file_name_of(&loaded.path)));
        let size = fs::replace_via(&loaded.path, &staged, |w| workspace.write_file(file_id, w))?;
        log::info!("Rewrote {} ({} bytes)", loaded.path.display(), size);
        rewritten.push(loaded.path.clone());
    }
    Ok(rewritten)
}
