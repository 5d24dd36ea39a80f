//! Object dumps: export to editable files and import back.
//!
//! Exporting writes every bundle entry next to the bundle as a staging
//! payload (`<bundle>_<entry>`), loads the serialized-file payloads into a
//! [`Workspace`](crate::workspace::Workspace) and writes one dump per
//! selected object. Importing reverses this: dumps are matched back to
//! objects by their file names (see [`DumpIdentity`]), the changed payloads
//! are rewritten in place, and the payloads are written back into the
//! bundle.
//!
//! The session-level commands are
//! [`Session::export_dumps`](crate::Session::export_dumps) and
//! [`Session::import_dumps`](crate::Session::import_dumps); this module
//! holds the steps they are made of.

mod export;
mod identity;
mod import;

pub use export::{FAILED_DUMP_TEXT, StagedPayload, export_objects, load_workspace, stage_payloads};
pub use identity::{DumpIdentity, MAX_TOKEN_LEN, sanitize_entry_name, sanitize_token};
pub use import::{ImportOutcome, commit_changes, import_objects};

use std::path::PathBuf;

use crate::codec::Compression;

/// Dump file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DumpFormat {
    /// The indented text format.
    #[default]
    Text,
    /// JSON.
    Json,
}

impl DumpFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            DumpFormat::Text => "txt",
            DumpFormat::Json => "json",
        }
    }

    /// The format for a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" => Some(DumpFormat::Text),
            "json" => Some(DumpFormat::Json),
            _ => None,
        }
    }
}

/// Which objects to export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DumpFilter {
    /// Every object.
    #[default]
    All,
    /// Objects whose display name contains any of the tokens.
    NameContains(Vec<String>),
}

impl DumpFilter {
    /// Returns `true` if an object named `name` is selected.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            DumpFilter::All => true,
            DumpFilter::NameContains(tokens) => tokens.iter().any(|t| name.contains(t.as_str())),
        }
    }
}

/// Options for [`Session::import_dumps`](crate::Session::import_dumps).
#[derive(Debug, Clone, Default)]
pub struct ImportDumpsOptions {
    /// Recompress the rewritten bundle with this kind.
    pub recompress: Option<Compression>,
    /// Remove the staging payloads and applied dumps after a successful import.
    pub delete_artifacts: bool,
}

impl ImportDumpsOptions {
    /// Creates default options: no recompression, keep artifacts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recompression kind.
    pub fn recompress(mut self, kind: Option<Compression>) -> Self {
        self.recompress = kind;
        self
    }

    /// Sets whether artifacts are deleted on success.
    pub fn delete_artifacts(mut self, delete: bool) -> Self {
        self.delete_artifacts = delete;
        self
    }
}

/// Result of an export.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Staging payloads written, one per bundle entry.
    pub payloads: Vec<PathBuf>,
    /// Dump files written, including failed ones.
    pub dumps: Vec<PathBuf>,
    /// Dumps that hold the failure line instead of fields.
    pub failed: Vec<PathBuf>,
}

/// Result of an import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Staging payloads written back into the bundle.
    pub payloads: Vec<PathBuf>,
    /// Payloads rewritten because one of their objects changed.
    pub rewritten: Vec<PathBuf>,
    /// Dumps applied to objects.
    pub applied: Vec<PathBuf>,
    /// Dumps that could not be decoded, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Dumps skipped because another dump names the same object.
    pub ambiguous: Vec<PathBuf>,
    /// Dumps naming objects that do not exist.
    pub unmatched: Vec<PathBuf>,
    /// The rewritten bundle.
    pub output: PathBuf,
    /// Whether artifacts were deleted.
    pub artifacts_deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter() {
        assert!(DumpFilter::All.matches("anything"));
        let filter = DumpFilter::NameContains(vec!["Mesh".into(), "Hud".into()]);
        assert!(filter.matches("TextMeshProUGUI"));
        assert!(filter.matches("HudRoot"));
        assert!(!filter.matches("mesh"));
        assert!(!DumpFilter::NameContains(Vec::new()).matches("x"));
    }

    #[test]
    fn test_format_extensions() {
        for format in [DumpFormat::Text, DumpFormat::Json] {
            assert_eq!(DumpFormat::from_extension(format.extension()), Some(format));
        }
        assert_eq!(DumpFormat::from_extension("TXT"), None);
    }
}
