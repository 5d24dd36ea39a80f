//! Directory-wide export and import of bundle entries.
//!
//! Both commands list the directory once, sort the names and visit every
//! bundle in it. Side files (`.decomp`, `.mod`) and files that are not
//! bundles are skipped. A failing bundle is logged and recorded in the
//! [`BatchReport`]; the batch carries on with the next one.
//!
//! Bundles are processed one after another. The opt-in `parallel` feature
//! runs them on a `rayon` pool instead, except for exports that keep bare
//! entry names, whose payload files may collide. The report keeps name
//! order either way.

use std::path::{Path, PathBuf};

use crate::dump::{self, StagedPayload};
use crate::format::{FileKind, detect_path};
use crate::fs;
use crate::session::{self, Session};
use crate::{Error, Result};

/// Options for [`Session::batch_export`].
#[derive(Debug, Clone, Default)]
pub struct BatchExportOptions {
    /// Name payloads after the entry alone instead of `<bundle>_<entry>`.
    ///
    /// Such payloads cannot be imported back with
    /// [`Session::batch_import`].
    pub keep_original_names: bool,
}

impl BatchExportOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether payloads keep the bare entry name.
    pub fn keep_original_names(mut self, keep: bool) -> Self {
        self.keep_original_names = keep;
        self
    }
}

/// What happened to one bundle of a batch.
#[derive(Debug)]
pub struct BatchMember {
    /// The bundle.
    pub path: PathBuf,
    /// Files written for it: payloads on export, the bundle on import.
    pub outputs: Vec<PathBuf>,
    /// Why it failed, if it did.
    pub error: Option<Error>,
}

impl BatchMember {
    /// Returns `true` if the bundle was processed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a batch command.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Bundles visited, in name order.
    pub processed: Vec<BatchMember>,
    /// Files left alone.
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    /// Members that failed.
    pub fn failures(&self) -> impl Iterator<Item = &BatchMember> {
        self.processed.iter().filter(|m| !m.is_ok())
    }

    /// Returns `true` if any member failed.
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    fn record(&mut self, path: PathBuf, result: Result<Vec<PathBuf>>) {
        let member = match result {
            Ok(outputs) => BatchMember {
                path,
                outputs,
                error: None,
            },
            Err(e) => {
                log::warn!("Failed on {}: {}", path.display(), e);
                BatchMember {
                    path,
                    outputs: Vec::new(),
                    error: Some(e),
                }
            }
        };
        self.processed.push(member);
    }
}

/// The sorted regular files of `dir`, with non-bundles moved to `skipped`.
fn bundles_in(dir: &Path, report: &mut BatchReport) -> Result<Vec<PathBuf>> {
    fs::require_dir(dir)?;
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut bundles = Vec::new();
    for path in files {
        if fs::is_side_file(&path) {
            report.skipped.push(path);
            continue;
        }
        match detect_path(&path) {
            Ok(FileKind::Bundle) => bundles.push(path),
            Ok(kind) => {
                log::debug!("Skipping {} ({})", path.display(), kind);
                report.skipped.push(path);
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                report.skipped.push(path);
            }
        }
    }
    Ok(bundles)
}

/// Runs `job` on every bundle, concurrently when `concurrent` is set and
/// the `parallel` feature is enabled.
#[cfg(feature = "parallel")]
fn visit<T, F>(bundles: Vec<PathBuf>, concurrent: bool, job: F) -> Vec<(PathBuf, T)>
where
    T: Send,
    F: Fn(&Path) -> T + Sync,
{
    use rayon::prelude::*;

    if !concurrent {
        return visit_in_order(bundles, job);
    }
    bundles
        .into_par_iter()
        .map(|path| {
            let result = job(&path);
            (path, result)
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn visit<T, F>(bundles: Vec<PathBuf>, _concurrent: bool, job: F) -> Vec<(PathBuf, T)>
where
    F: Fn(&Path) -> T,
{
    visit_in_order(bundles, job)
}

fn visit_in_order<T, F>(bundles: Vec<PathBuf>, job: F) -> Vec<(PathBuf, T)>
where
    F: Fn(&Path) -> T,
{
    bundles
        .into_iter()
        .map(|path| {
            let result = job(&path);
            (path, result)
        })
        .collect()
}

pub(crate) fn export(
    session: &Session,
    dir: &Path,
    options: &BatchExportOptions,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let bundles = bundles_in(dir, &mut report)?;
    // Bare entry names can collide between bundles.
    let concurrent = !options.keep_original_names;
    let results = visit(bundles, concurrent, |path| {
        export_one(session, path, dir, options)
    });
    for (path, result) in results {
        report.record(path, result);
    }
    log::info!(
        "Exported {} bundle(s), {} failed",
        report.processed.len(),
        report.failures().count()
    );
    Ok(report)
}

fn export_one(
    session: &Session,
    path: &Path,
    dir: &Path,
    options: &BatchExportOptions,
) -> Result<Vec<PathBuf>> {
    let name = fs::file_name_of(path);
    let prefix = (!options.keep_original_names).then_some(name.as_str());
    let mut open = session.open_container(path)?;
    let staged = dump::stage_payloads(&mut open.bundle, dir, prefix)?;
    Ok(staged.into_iter().map(|p| p.path).collect())
}

pub(crate) fn import(session: &Session, dir: &Path) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let bundles = bundles_in(dir, &mut report)?;
    for (path, result) in visit(bundles, true, |path| import_one(session, path, dir)) {
        match result {
            Ok(None) => {
                log::debug!("Nothing to import into {}", path.display());
                report.skipped.push(path);
            }
            Ok(Some(output)) => report.record(path, Ok(vec![output])),
            Err(e) => report.record(path, Err(e)),
        }
    }
    log::info!(
        "Imported into {} bundle(s), {} failed",
        report.processed.len(),
        report.failures().count()
    );
    Ok(report)
}

fn import_one(session: &Session, path: &Path, dir: &Path) -> Result<Option<PathBuf>> {
    let name = fs::file_name_of(path);
    let open = session.open_container(path)?;
    let payloads: Vec<StagedPayload> = session::find_payloads(&open, dir, Some(&name));
    if payloads.is_empty() {
        return Ok(None);
    }
    session::rewrite_container(open, path, &payloads, None)?;
    Ok(Some(path.to_path_buf()))
}
