//! File system helpers shared by the pipelines.
//!
//! Side files are named by appending to the full file name of the file they
//! belong to, so `level0.bundle` gets `level0.bundle.decomp`,
//! `level0.bundle.mod` and `level0.bundle.bak0000`. Output files are always
//! written under a side name first and then renamed over their target.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Suffix of decompressed scratch copies.
pub const DECOMP_SUFFIX: &str = ".decomp";

/// Suffix of staged outputs.
pub const MOD_SUFFIX: &str = ".mod";

/// `path` with `suffix` appended to its file name.
pub fn side_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Returns `true` for the side files this crate creates.
pub fn is_side_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(DECOMP_SUFFIX) || n.ends_with(MOD_SUFFIX))
}

/// The final component of `path` as a string, lossily converted.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The directory containing `path`, or `.` for a bare file name.
pub(crate) fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Fails with [`Error::MissingFile`] unless `path` is a file.
pub(crate) fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingFile {
            path: path.to_path_buf(),
        })
    }
}

/// Fails with [`Error::DirectoryNotFound`] unless `path` is a directory.
pub(crate) fn require_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::DirectoryNotFound {
            path: path.to_path_buf(),
        })
    }
}

pub(crate) fn write_failure(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |source| Error::WriteFailure {
        path: path.to_path_buf(),
        source,
    }
}

/// Creates (or truncates) `path` for buffered writing.
pub(crate) fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(write_failure(path))
}

/// Flushes a writer returned by [`create`].
pub(crate) fn finish(path: &Path, writer: BufWriter<File>) -> Result<()> {
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(|file| file.sync_all())
        .map_err(write_failure(path))
}

/// Writes `bytes` to `path`.
pub(crate) fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut writer = create(path)?;
    writer.write_all(bytes).map_err(write_failure(path))?;
    finish(path, writer)
}

/// Fills `path` with `produce`, removing the file if anything fails.
pub(crate) fn write_via<T>(
    path: &Path,
    produce: impl FnOnce(&mut BufWriter<File>) -> Result<T>,
) -> Result<T> {
    let result = create(path).and_then(|mut writer| {
        let value = produce(&mut writer)?;
        finish(path, writer)?;
        Ok(value)
    });
    if result.is_err() {
        remove_quietly(path);
    }
    result
}

/// Writes `path` through the side file `staged`: `produce` fills `staged`,
/// which is then renamed over `path`. The side file is removed if anything
/// fails.
pub(crate) fn replace_via<T>(
    path: &Path,
    staged: &Path,
    produce: impl FnOnce(&mut BufWriter<File>) -> Result<T>,
) -> Result<T> {
    let value = write_via(staged, produce)?;
    if let Err(e) = fs::rename(staged, path) {
        remove_quietly(staged);
        return Err(write_failure(path)(e));
    }
    Ok(value)
}

/// Removes a file, ignoring a missing one.
pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::WriteFailure {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Removes a file on a cleanup path, logging instead of failing.
pub(crate) fn remove_quietly(path: &Path) {
    if let Err(e) = remove_if_exists(path) {
        log::warn!("{}", e);
    }
}
