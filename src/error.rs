//! Error types for bundle patching operations.
//!
//! This module provides the [`Error`] enum which represents every failure
//! mode of the patching pipeline, along with the crate-wide [`Result<T>`]
//! alias.
//!
//! # Error Handling
//!
//! All fallible operations return `Result<T, Error>`:
//!
//! ```rust,no_run
//! use bundlepatch::{Result, Session};
//!
//! fn export(dir: &str) -> Result<()> {
//!     let session = Session::new();
//!     let report = session.batch_export(dir, &Default::default())?;
//!     println!("{} bundles exported", report.processed.len());
//!     Ok(())
//! }
//! ```
//!
//! Callers that need to map failures onto coarse categories (for example a
//! CLI choosing an exit code) can use [`Error::is_parse_error`],
//! [`Error::is_io_error`] and [`Error::is_missing_input`]:
//!
//! ```rust
//! use bundlepatch::Error;
//!
//! fn describe(error: &Error) -> &'static str {
//!     if error.is_missing_input() {
//!         "input not found"
//!     } else if error.is_parse_error() {
//!         "file could not be decoded"
//!     } else {
//!         "operation failed"
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// The main error type for bundle patching operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Input | [`MissingFile`][Self::MissingFile], [`DirectoryNotFound`][Self::DirectoryNotFound] | Wrong paths |
/// | Format | [`ContainerParse`][Self::ContainerParse], [`AssetsParse`][Self::AssetsParse], [`Truncated`][Self::Truncated] | Damaged or foreign files |
/// | Codec | [`UnsupportedCompression`][Self::UnsupportedCompression], [`Codec`][Self::Codec] | Compressed payloads |
/// | Contract | [`DuplicateReplacer`][Self::DuplicateReplacer], [`EntryNotFound`][Self::EntryNotFound] | Caller mistakes |
/// | Dumps | [`DumpDecode`][Self::DumpDecode], [`Deserialize`][Self::Deserialize] | Edited dump files |
/// | Install | [`BackupExhausted`][Self::BackupExhausted], [`InstallAborted`][Self::InstallAborted] | Patch packages |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required input file does not exist.
    #[error("File not found: {}", path.display())]
    MissingFile {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A required directory does not exist.
    #[error("Directory not found: {}", path.display())]
    DirectoryNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The bundle header or directory could not be decoded.
    ///
    /// The offset points at the byte where decoding stopped, relative to the
    /// start of the structure being decoded.
    #[error("Invalid bundle at offset {offset:#x}: {reason}")]
    ContainerParse {
        /// Byte offset of the failure.
        offset: u64,
        /// What was wrong.
        reason: String,
    },

    /// A serialized (assets) file could not be decoded.
    #[error("Invalid assets file at offset {offset:#x}: {reason}")]
    AssetsParse {
        /// Byte offset of the failure.
        offset: u64,
        /// What was wrong.
        reason: String,
    },

    /// A structure ended before all of its fields were read.
    #[error("Unexpected end of data at offset {offset:#x} (needed {needed} more bytes)")]
    Truncated {
        /// Offset where the read started.
        offset: u64,
        /// Number of bytes that were missing.
        needed: u64,
    },

    /// The bundle uses a compression kind this build cannot handle.
    ///
    /// Kinds `1` (LZMA) and `2`/`3` (LZ4, LZ4HC) require the `lzma` and `lz4`
    /// features respectively.
    #[error("Unsupported compression kind: {kind}")]
    UnsupportedCompression {
        /// The raw compression kind from the flags.
        kind: u32,
    },

    /// Raw entry bytes were requested from a bundle whose blocks are still compressed.
    #[error("Bundle data is {compression}-compressed; decompress it first")]
    CompressedBundle {
        /// Name of the block compression kind.
        compression: &'static str,
    },

    /// A serialized file version outside the supported range.
    #[error("Unsupported serialized file version {version}")]
    UnsupportedVersion {
        /// The version found in the header.
        version: u32,
    },

    /// A compression codec reported a failure.
    #[error("{method} codec error: {reason}")]
    Codec {
        /// Codec name.
        method: &'static str,
        /// Codec message.
        reason: String,
    },

    /// No entry with this name exists in the bundle.
    #[error("Entry not found: {name}")]
    EntryNotFound {
        /// The entry name.
        name: String,
    },

    /// No object with this path id exists in the assets file.
    #[error("Object not found: path id {path_id}")]
    ObjectNotFound {
        /// The object path id.
        path_id: i64,
    },

    /// Two replacers were registered for the same key.
    #[error("Duplicate replacer for {key}")]
    DuplicateReplacer {
        /// The key, rendered for display.
        key: String,
    },

    /// Every backup slot `<path>.bak0000` through `<path>.bak9999` is taken.
    #[error("No free backup slot for {}", path.display())]
    BackupExhausted {
        /// The file that needed a backup.
        path: PathBuf,
    },

    /// A dump file could not be turned back into object bytes.
    #[error("Cannot decode dump {}: {reason}", path.display())]
    DumpDecode {
        /// The dump file.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// Object bytes did not match their type tree.
    #[error("Cannot deserialize object: {0}")]
    Deserialize(String),

    /// The object has no type tree, so its fields cannot be decoded.
    #[error("No type tree for class {class_id}")]
    MissingTypeTree {
        /// The class id of the object.
        class_id: i32,
    },

    /// The patch manifest is malformed or inconsistent.
    #[error("Invalid patch manifest: {0}")]
    InvalidManifest(String),

    /// `import-dumps` found no exported payloads next to the bundle.
    #[error("No files to import for {}", path.display())]
    NothingToImport {
        /// The bundle that was being imported into.
        path: PathBuf,
    },

    /// Writing an output file failed.
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailure {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A patch package stopped part-way through.
    ///
    /// Files installed before the failure are left swapped and backed up.
    #[error("Patch aborted at {} after {installed} installed file(s): {source}", path.display())]
    InstallAborted {
        /// The file that failed.
        path: PathBuf,
        /// How many files were already swapped into place.
        installed: usize,
        /// The failure.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Builds a [`Error::ContainerParse`].
    pub(crate) fn container(offset: u64, reason: impl Into<String>) -> Self {
        Error::ContainerParse {
            offset,
            reason: reason.into(),
        }
    }

    /// Builds a [`Error::AssetsParse`].
    pub(crate) fn assets(offset: u64, reason: impl Into<String>) -> Self {
        Error::AssetsParse {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns the innermost error, looking through [`Error::InstallAborted`].
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::InstallAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns `true` if some input could not be decoded.
    ///
    /// Covers malformed bundles, assets files, type trees, dumps and manifests.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::ContainerParse { .. }
                | Error::AssetsParse { .. }
                | Error::Truncated { .. }
                | Error::UnsupportedCompression { .. }
                | Error::CompressedBundle { .. }
                | Error::UnsupportedVersion { .. }
                | Error::Codec { .. }
                | Error::DumpDecode { .. }
                | Error::Deserialize(_)
                | Error::MissingTypeTree { .. }
                | Error::InvalidManifest(_)
        )
    }

    /// Returns `true` for file system failures.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::Io(_) | Error::WriteFailure { .. } | Error::BackupExhausted { .. }
        )
    }

    /// Returns `true` if a named input does not exist.
    pub fn is_missing_input(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::MissingFile { .. }
                | Error::DirectoryNotFound { .. }
                | Error::EntryNotFound { .. }
                | Error::ObjectNotFound { .. }
                | Error::NothingToImport { .. }
        )
    }
}

/// A specialized Result type for bundle patching operations.
pub type Result<T> = std::result::Result<T, Error>;
