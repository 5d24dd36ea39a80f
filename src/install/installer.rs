//! Staging and swapping patched files.

use std::path::{Path, PathBuf};

use super::manifest::{AffectedFile, PatchManifest, ReplacerDescriptor};
use super::next_backup_path;
use crate::assets::SerializedFile;
use crate::edit::{RegionSource, Replacer, ReplacerSet};
use crate::fs::{self, MOD_SUFFIX, side_path};
use crate::read::Bundle;
use crate::session::Session;
use crate::write::write_bundle;
use crate::{Error, Result};

/// Options for [`Session::apply_patch`].
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Stage every file before swapping any of them.
    pub staged_commit: bool,
}

impl InstallOptions {
    /// Creates default options: stage and swap one file at a time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether all files are staged before the first swap.
    ///
    /// With staged commit a staging failure leaves every target untouched;
    /// a failure while swapping can still leave earlier files swapped.
    pub fn staged_commit(mut self, staged: bool) -> Self {
        self.staged_commit = staged;
        self
    }
}

/// A file swapped into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledFile {
    /// The patched file.
    pub target: PathBuf,
    /// Where the original was moved.
    pub backup: PathBuf,
}

/// Result of a patch install.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Patch name from the manifest.
    pub name: String,
    /// Installed files in manifest order.
    pub installed: Vec<InstalledFile>,
}

struct Staged {
    target: PathBuf,
    staged: PathBuf,
    backup: PathBuf,
}

pub(crate) fn apply(
    session: &Session,
    manifest_file: &Path,
    root: &Path,
    options: &InstallOptions,
) -> Result<InstallReport> {
    fs::require_dir(root)?;
    let manifest = PatchManifest::from_path(manifest_file)?;
    let base = fs::parent_of(manifest_file);

    log::info!("Installing {} by {}", manifest.name, manifest.creators);
    if !manifest.description.is_empty() {
        log::info!("{}", manifest.description);
    }

    let mut report = InstallReport {
        name: manifest.name.clone(),
        installed: Vec::new(),
    };
    if options.staged_commit {
        install_staged(session, &manifest, root, &base, &mut report)?;
    } else {
        install_each(session, &manifest, root, &base, &mut report)?;
    }
    log::info!("Installed {} file(s)", report.installed.len());
    Ok(report)
}

fn install_each(
    session: &Session,
    manifest: &PatchManifest,
    root: &Path,
    base: &Path,
    report: &mut InstallReport,
) -> Result<()> {
    for file in &manifest.affected_files {
        let target = root.join(&file.path);
        let installed = stage(session, file, &target, base).and_then(|staged| swap(&staged));
        match installed {
            Ok(done) => report.installed.push(done),
            Err(source) => {
                return Err(Error::InstallAborted {
                    path: target,
                    installed: report.installed.len(),
                    source: Box::new(source),
                });
            }
        }
    }
    Ok(())
}

fn install_staged(
    session: &Session,
    manifest: &PatchManifest,
    root: &Path,
    base: &Path,
    report: &mut InstallReport,
) -> Result<()> {
    let mut ready: Vec<Staged> = Vec::with_capacity(manifest.affected_files.len());
    for file in &manifest.affected_files {
        let target = root.join(&file.path);
        match stage(session, file, &target, base) {
            Ok(staged) => ready.push(staged),
            Err(source) => {
                for staged in &ready {
                    fs::remove_quietly(&staged.staged);
                }
                return Err(Error::InstallAborted {
                    path: target,
                    installed: 0,
                    source: Box::new(source),
                });
            }
        }
    }

    let mut pending = ready.into_iter();
    while let Some(staged) = pending.next() {
        let target = staged.target.clone();
        match swap(&staged) {
            Ok(done) => report.installed.push(done),
            Err(source) => {
                for rest in pending {
                    fs::remove_quietly(&rest.staged);
                }
                return Err(Error::InstallAborted {
                    path: target,
                    installed: report.installed.len(),
                    source: Box::new(source),
                });
            }
        }
    }
    Ok(())
}

/// Writes the patched form of `target` to `<target>.mod`.
fn stage(session: &Session, file: &AffectedFile, target: &Path, base: &Path) -> Result<Staged> {
    fs::require_file(target)?;
    let backup = next_backup_path(target)?;
    let staged = side_path(target, MOD_SUFFIX);

    for added in &file.added_types {
        log::info!(
            "Ignoring added type {} for {}",
            added.class_id,
            target.display()
        );
    }

    log::info!("Writing {}", staged.display());
    if file.is_container {
        let mut open = session.open_container(target)?;
        let replacers = resolve_entries(&mut open.bundle, file, base)?;
        fs::write_via(&staged, |w| write_bundle(&mut open.bundle, &replacers, w))?;
    } else {
        let assets = SerializedFile::open_path(target)?;
        let replacers = resolve_objects(file, base)?;
        fs::write_via(&staged, |w| assets.write_with(&replacers, w))?;
    }

    Ok(Staged {
        target: target.to_path_buf(),
        staged,
        backup,
    })
}

/// Moves the original to its backup and the staged file into place.
fn swap(staged: &Staged) -> Result<InstalledFile> {
    log::info!("Swapping {}", staged.target.display());
    if let Err(e) = std::fs::rename(&staged.target, &staged.backup) {
        fs::remove_quietly(&staged.staged);
        return Err(fs::write_failure(&staged.backup)(e));
    }
    if let Err(e) = std::fs::rename(&staged.staged, &staged.target) {
        if let Err(undo) = std::fs::rename(&staged.backup, &staged.target) {
            log::error!(
                "Cannot restore {} from {}: {}",
                staged.target.display(),
                staged.backup.display(),
                undo
            );
        }
        fs::remove_quietly(&staged.staged);
        return Err(fs::write_failure(&staged.target)(e));
    }
    Ok(InstalledFile {
        target: staged.target.clone(),
        backup: staged.backup.clone(),
    })
}

fn resolve_entries<R: std::io::Read + std::io::Seek>(
    bundle: &mut Bundle<R>,
    file: &AffectedFile,
    base: &Path,
) -> Result<ReplacerSet<String>> {
    let mut set = ReplacerSet::new();
    for descriptor in &file.replacers {
        match descriptor {
            ReplacerDescriptor::Entry { name, source } => {
                set.insert(name.clone(), Replacer::from_file(base.join(source))?)?;
            }
            ReplacerDescriptor::CopyEntry { name, from } => {
                let entry = bundle
                    .entry(from)
                    .ok_or_else(|| Error::EntryNotFound { name: from.clone() })?;
                let replacer = Replacer::FromRegion {
                    source: RegionSource::Original,
                    offset: entry.offset,
                    length: entry.size,
                };
                set.insert(name.clone(), replacer)?;
            }
            ReplacerDescriptor::EntryObjects { name, objects } => {
                let assets = SerializedFile::parse(bundle.read_entry(name)?)?;
                let mut patched = ReplacerSet::new();
                for object in objects {
                    patched.insert(object.path_id, Replacer::from_file(base.join(&object.source))?)?;
                }
                set.insert(name.clone(), Replacer::FromBuffer(assets.to_bytes_with(&patched)?))?;
            }
            ReplacerDescriptor::Object { .. } => {
                return Err(Error::InvalidManifest(format!(
                    "object change listed for bundle {}",
                    file.path.display()
                )));
            }
        }
    }
    Ok(set)
}

fn resolve_objects(file: &AffectedFile, base: &Path) -> Result<ReplacerSet<i64>> {
    let mut set = ReplacerSet::new();
    for descriptor in &file.replacers {
        match descriptor {
            ReplacerDescriptor::Object { path_id, source } => {
                set.insert(*path_id, Replacer::from_file(base.join(source))?)?;
            }
            other => {
                return Err(Error::InvalidManifest(format!(
                    "{:?} listed for serialized file {}",
                    other,
                    file.path.display()
                )));
            }
        }
    }
    Ok(set)
}
