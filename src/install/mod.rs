//! Patch package installation.
//!
//! A [`PatchManifest`] lists the files a patch changes. Each file is staged
//! into `<file>.mod`, the original is moved to the first free
//! `<file>.bak####` slot and the staged file takes its place. Files are
//! processed in manifest order; a failure stops the run and leaves the
//! files before it installed (see [`InstallOptions::staged_commit`] for
//! staging everything first).
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlepatch::Session;
//! use bundlepatch::install::InstallOptions;
//!
//! let session = Session::new();
//! let report = session.apply_patch("patch/manifest.json", "Game_Data", &InstallOptions::new())?;
//! for file in &report.installed {
//!     println!("{} (backup {})", file.target.display(), file.backup.display());
//! }
//! # Ok::<(), bundlepatch::Error>(())
//! ```

mod backup;
mod installer;
mod manifest;

pub use backup::{BACKUP_SLOTS, backup_path, next_backup_path, next_backup_path_by};
pub use installer::{InstallOptions, InstallReport, InstalledFile};
pub use manifest::{
    AddedTypeDescriptor, AffectedFile, ObjectSource, PatchManifest, ReplacerDescriptor,
};

pub(crate) use installer::apply;
