//! The per-invocation context.
//!
//! A [`Session`] carries the settings every command shares: how compressed
//! bundles are unpacked ([`ScratchOptions`]) and which [`ObjectSerializer`]
//! decodes objects. All library commands are methods on it.
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlepatch::Session;
//! use bundlepatch::dump::{DumpFilter, DumpFormat};
//! use bundlepatch::session::ScratchOptions;
//!
//! let session = Session::new().with_scratch(ScratchOptions::new().keep(true));
//! let filter = DumpFilter::NameContains(vec!["TextMeshProUGUI".into()]);
//! let report = session.export_dumps("modelist.bundle", &filter, DumpFormat::Text)?;
//! println!("{} dumps written", report.dumps.len());
//! # Ok::<(), bundlepatch::Error>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use crate::batch::{self, BatchExportOptions, BatchReport};
use crate::codec::Compression;
use crate::dump::{
    self, DumpFilter, DumpFormat, ExportReport, ImportDumpsOptions, ImportReport, StagedPayload,
};
use crate::edit::{Replacer, ReplacerSet};
use crate::format::{FileKind, detect_path};
use crate::fs::{self, DECOMP_SUFFIX, MOD_SUFFIX, side_path};
use crate::install::{self, InstallOptions, InstallReport};
use crate::read::{Bundle, Payload, Scratch, decompress_bundle};
use crate::typetree::{ObjectSerializer, TypeTreeSerializer};
use crate::workspace::{LoadedFile, Workspace};
use crate::write::{WriteResult, pack_bundle, write_bundle};
use crate::{Error, Result};

/// How compressed bundles are unpacked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScratchOptions {
    /// Keep `<bundle>.decomp` after use.
    pub keep: bool,
    /// Overwrite an existing `<bundle>.decomp` instead of reusing it.
    pub force: bool,
    /// Unpack in memory and never create `.decomp` files.
    pub memory_only: bool,
}

impl ScratchOptions {
    /// Creates default options: unpack to a `.decomp` file, reuse a matching
    /// one, delete it afterwards.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether `.decomp` files are kept.
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Sets whether existing `.decomp` files are overwritten.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets whether unpacking happens in memory.
    pub fn memory_only(mut self, memory_only: bool) -> Self {
        self.memory_only = memory_only;
        self
    }
}

/// Removes a `.decomp` file when dropped, unless asked to keep it.
#[derive(Debug)]
struct ScratchGuard {
    path: Option<PathBuf>,
    keep: bool,
}

impl ScratchGuard {
    fn none() -> Self {
        Self {
            path: None,
            keep: false,
        }
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if let (Some(path), false) = (&self.path, self.keep) {
            log::debug!("Removing {}", path.display());
            fs::remove_quietly(path);
        }
    }
}

/// A decompressed bundle opened from disk.
///
/// The bundle's reader is closed before the scratch file is removed.
#[derive(Debug)]
pub struct OpenContainer {
    /// The bundle, readable entry by entry.
    pub bundle: Bundle<Payload<BufReader<File>>>,
    scratch: ScratchGuard,
}

impl OpenContainer {
    /// The `.decomp` file backing the bundle, if any.
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.path.as_deref()
    }
}

/// Settings shared by every command of one invocation.
pub struct Session {
    scratch: ScratchOptions,
    serializer: Box<dyn ObjectSerializer>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session with default scratch options and the type tree
    /// serializer.
    pub fn new() -> Self {
        Self {
            scratch: ScratchOptions::default(),
            serializer: Box::new(TypeTreeSerializer),
        }
    }

    /// Replaces the scratch options.
    pub fn with_scratch(mut self, scratch: ScratchOptions) -> Self {
        self.scratch = scratch;
        self
    }

    /// Replaces the object serializer.
    pub fn with_serializer(mut self, serializer: impl ObjectSerializer + 'static) -> Self {
        self.serializer = Box::new(serializer);
        self
    }

    /// The scratch options.
    pub fn scratch(&self) -> &ScratchOptions {
        &self.scratch
    }

    /// The object serializer.
    pub fn serializer(&self) -> &dyn ObjectSerializer {
        self.serializer.as_ref()
    }

    /// Opens a bundle and decompresses it according to the scratch options.
    ///
    /// Uncompressed bundles are read in place. Compressed ones are unpacked
    /// into memory or into `<path>.decomp`; without
    /// [`force`](ScratchOptions::force) an existing `.decomp` with the same
    /// directory as the bundle is reused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if `path` does not exist, and parse or
    /// codec errors from the bundle.
    pub fn open_container(&self, path: impl AsRef<Path>) -> Result<OpenContainer> {
        let path = path.as_ref();
        fs::require_file(path)?;
        let bundle = Bundle::open_path(path)?;

        if !bundle.is_compressed() {
            return Ok(OpenContainer {
                bundle: bundle.map_reader(Payload::Source),
                scratch: ScratchGuard::none(),
            });
        }
        if self.scratch.memory_only {
            log::info!("Decompressing {} in memory", path.display());
            return Ok(OpenContainer {
                bundle: decompress_bundle(bundle, &Scratch::Memory)?,
                scratch: ScratchGuard::none(),
            });
        }

        let decomp = side_path(path, DECOMP_SUFFIX);
        let scratch = ScratchGuard {
            path: Some(decomp.clone()),
            keep: self.scratch.keep,
        };
        if !self.scratch.force {
            if let Some(bundle) = reuse_scratch(&decomp, &bundle) {
                log::info!("Reusing {}", decomp.display());
                return Ok(OpenContainer { bundle, scratch });
            }
        }
        log::info!("Decompressing {} to {}", path.display(), decomp.display());
        let bundle = decompress_bundle(bundle, &Scratch::Disk(decomp))?;
        Ok(OpenContainer { bundle, scratch })
    }

    /// Loads a bundle's serialized entries, or a bare serialized file, into
    /// a workspace without writing anything next to it.
    ///
    /// Entries that do not parse are logged and left out.
    pub fn inspect(&self, path: impl AsRef<Path>) -> Result<Workspace> {
        let path = path.as_ref();
        fs::require_file(path)?;
        let name = fs::file_name_of(path);

        let files = match detect_path(path)? {
            FileKind::Bundle => {
                let mut open = self.open_container(path)?;
                let entries: Vec<_> = open
                    .bundle
                    .entries()
                    .iter()
                    .filter(|e| e.is_serialized_file())
                    .map(|e| e.name.clone())
                    .collect();
                let mut files = Vec::with_capacity(entries.len());
                for entry in entries {
                    let data = open.bundle.read_entry(&entry)?;
                    let stem = StagedPayload::file_name(Some(&name), &entry);
                    match LoadedFile::from_bytes(entry.as_str(), path, stem, data) {
                        Ok(file) => files.push(file),
                        Err(e) => log::warn!("Skipping {}: {}", entry, e),
                    }
                }
                files
            }
            _ => vec![LoadedFile::load(name.as_str(), path, name.as_str())?],
        };
        Ok(Workspace::from_files(files, self.serializer()))
    }

    /// Exports the entries of every bundle in `directory`.
    pub fn batch_export(
        &self,
        directory: impl AsRef<Path>,
        options: &BatchExportOptions,
    ) -> Result<BatchReport> {
        batch::export(self, directory.as_ref(), options)
    }

    /// Writes exported entries back into every bundle in `directory`.
    pub fn batch_import(&self, directory: impl AsRef<Path>) -> Result<BatchReport> {
        batch::import(self, directory.as_ref())
    }

    /// Installs a patch package under `root`.
    pub fn apply_patch(
        &self,
        manifest_file: impl AsRef<Path>,
        root: impl AsRef<Path>,
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        install::apply(self, manifest_file.as_ref(), root.as_ref(), options)
    }

    /// Stages the entries of `container` next to it and dumps the selected
    /// objects of its serialized files.
    pub fn export_dumps(
        &self,
        container: impl AsRef<Path>,
        filter: &DumpFilter,
        format: DumpFormat,
    ) -> Result<ExportReport> {
        let container = container.as_ref();
        let dir = fs::parent_of(container);
        let name = fs::file_name_of(container);

        let payloads = {
            let mut open = self.open_container(container)?;
            dump::stage_payloads(&mut open.bundle, &dir, Some(&name))?
        };
        let workspace = dump::load_workspace(&payloads, self.serializer());
        let mut report = dump::export_objects(&workspace, filter, format, self.serializer())?;
        report.payloads = payloads.into_iter().map(|p| p.path).collect();
        Ok(report)
    }

    /// Applies edited dumps to the staged payloads of `container` and writes
    /// the payloads back into it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToImport`] if no staged payload exists next
    /// to the bundle. Dumps that fail to decode are reported, not returned.
    pub fn import_dumps(
        &self,
        container: impl AsRef<Path>,
        options: &ImportDumpsOptions,
    ) -> Result<ImportReport> {
        let container = container.as_ref();
        let dir = fs::parent_of(container);
        let name = fs::file_name_of(container);

        let open = self.open_container(container)?;
        let payloads = find_payloads(&open, &dir, Some(&name));
        if payloads.is_empty() {
            return Err(Error::NothingToImport {
                path: container.to_path_buf(),
            });
        }

        let mut workspace = dump::load_workspace(&payloads, self.serializer());
        let outcome = dump::import_objects(&mut workspace, self.serializer())?;
        let rewritten = dump::commit_changes(&workspace)?;
        drop(workspace);

        rewrite_container(open, container, &payloads, options.recompress)?;

        let mut report = ImportReport {
            payloads: payloads.iter().map(|p| p.path.clone()).collect(),
            rewritten,
            applied: outcome.applied,
            failed: outcome.failed,
            ambiguous: outcome.ambiguous,
            unmatched: outcome.unmatched,
            output: container.to_path_buf(),
            artifacts_deleted: false,
        };
        if options.delete_artifacts {
            for path in report.payloads.iter().chain(&report.applied) {
                fs::remove_if_exists(path)?;
            }
            report.artifacts_deleted = true;
        }
        Ok(report)
    }
}

/// A `.decomp` file left by an earlier run, if it matches `source`.
fn reuse_scratch(
    decomp: &Path,
    source: &Bundle<BufReader<File>>,
) -> Option<Bundle<Payload<BufReader<File>>>> {
    if !decomp.is_file() {
        return None;
    }
    let len = std::fs::metadata(decomp).ok()?.len();
    let cached = Bundle::open_path(decomp).ok()?;
    let complete = cached.data_offset() + cached.data_size() <= len;
    if cached.is_compressed() || cached.entries() != source.entries() || !complete {
        log::debug!("Ignoring stale {}", decomp.display());
        return None;
    }
    Some(cached.map_reader(Payload::Disk))
}

/// The staged payloads of an open bundle that exist in `dir`.
pub(crate) fn find_payloads(
    open: &OpenContainer,
    dir: &Path,
    bundle_name: Option<&str>,
) -> Vec<StagedPayload> {
    open.bundle
        .entries()
        .iter()
        .filter_map(|entry| {
            let path = dir.join(StagedPayload::file_name(bundle_name, &entry.name));
            path.is_file().then(|| StagedPayload {
                entry_name: entry.name.clone(),
                path,
                serialized: entry.is_serialized_file(),
            })
        })
        .collect()
}

/// Writes `open` with the given payloads as entry contents to
/// `<container>.mod`, optionally recompressed, and renames it over
/// `container`.
pub(crate) fn rewrite_container(
    mut open: OpenContainer,
    container: &Path,
    payloads: &[StagedPayload],
    recompress: Option<Compression>,
) -> Result<WriteResult> {
    let mut replacers = ReplacerSet::new();
    for payload in payloads {
        log::info!("Importing {}", payload.path.display());
        replacers.insert(payload.entry_name.clone(), Replacer::from_file(&payload.path)?)?;
    }

    let staged = side_path(container, MOD_SUFFIX);
    log::info!("Writing {}", staged.display());
    let result = fs::write_via(&staged, |w| match recompress {
        None => write_bundle(&mut open.bundle, &replacers, w),
        Some(kind) => {
            let mut plain = Vec::new();
            write_bundle(&mut open.bundle, &replacers, &mut plain)?;
            let mut rewritten = Bundle::open(Cursor::new(plain))?;
            log::info!("Compressing with {}", kind);
            pack_bundle(&mut rewritten, kind, w)
        }
    })?;
    drop(open);

    if let Err(e) = std::fs::rename(&staged, container) {
        fs::remove_quietly(&staged);
        return Err(fs::write_failure(container)(e));
    }
    Ok(result)
}
