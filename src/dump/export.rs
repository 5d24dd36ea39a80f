//! Staging payloads and writing dumps.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use super::{DumpFilter, DumpFormat, DumpIdentity, ExportReport, sanitize_entry_name};
use crate::fs;
use crate::read::Bundle;
use crate::typetree::ObjectSerializer;
use crate::workspace::{LoadedFile, ObjectEntry, Workspace};
use crate::Result;

/// Written in place of fields when an object cannot be decoded.
pub const FAILED_DUMP_TEXT: &str = "Asset failed to deserialize.";

/// A bundle entry written out as a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPayload {
    /// Entry name inside the bundle.
    pub entry_name: String,
    /// Where the payload was written.
    pub path: PathBuf,
    /// Whether the entry is flagged as a serialized file.
    pub serialized: bool,
}

impl StagedPayload {
    /// The payload file name for `entry` of bundle file `bundle_name`:
    /// `<bundle_name>_<entry>`, or the entry name alone without a prefix.
    pub fn file_name(bundle_name: Option<&str>, entry: &str) -> String {
        let entry = sanitize_entry_name(entry);
        match bundle_name {
            Some(prefix) => format!("{}_{}", prefix, entry),
            None => entry,
        }
    }
}

/// Writes every entry of a decompressed bundle into `dir`.
///
/// Files are named by [`StagedPayload::file_name`] with `bundle_name` as
/// prefix; existing files are overwritten.
///
/// # Errors
///
/// Returns [`Error::WriteFailure`](crate::Error::WriteFailure) if a payload
/// cannot be written and [`Error::CompressedBundle`](crate::Error::CompressedBundle)
/// if `bundle` was not decompressed.
pub fn stage_payloads<R: Read + Seek>(
    bundle: &mut Bundle<R>,
    dir: &Path,
    bundle_name: Option<&str>,
) -> Result<Vec<StagedPayload>> {
    let entries = bundle.entries().to_vec();
    let mut staged = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = dir.join(StagedPayload::file_name(bundle_name, &entry.name));
        log::info!("Exporting {}", path.display());
        let mut writer = fs::create(&path)?;
        bundle.copy_region(entry.offset, entry.size, &mut writer)?;
        fs::finish(&path, writer)?;
        staged.push(StagedPayload {
            serialized: entry.is_serialized_file(),
            entry_name: entry.name,
            path,
        });
    }
    Ok(staged)
}

/// Loads the serialized-file payloads into a workspace.
///
/// Each file is known by its entry name and uses its payload file name as
/// dump stem. Payloads that do not parse are logged and left out.
pub fn load_workspace(payloads: &[StagedPayload], serializer: &dyn ObjectSerializer) -> Workspace {
    let mut files = Vec::new();
    for payload in payloads.iter().filter(|p| p.serialized) {
        let stem = fs::file_name_of(&payload.path);
        match LoadedFile::load(payload.entry_name.as_str(), &payload.path, stem) {
            Ok(file) => files.push(file),
            Err(e) => log::warn!("Skipping {}: {}", payload.path.display(), e),
        }
    }
    Workspace::from_files(files, serializer)
}

/// Writes a dump for every object selected by `filter`, next to the payload
/// file holding the object.
///
/// Objects that cannot be decoded get a dump holding [`FAILED_DUMP_TEXT`];
/// they are listed in [`ExportReport::failed`] and do not stop the export.
pub fn export_objects(
    workspace: &Workspace,
    filter: &DumpFilter,
    format: DumpFormat,
    serializer: &dyn ObjectSerializer,
) -> Result<ExportReport> {
    let mut report = ExportReport::default();
    for object in workspace.objects() {
        if !filter.matches(&object.display_name) {
            continue;
        }
        let Some(loaded) = workspace.file(object.file_id) else {
            continue;
        };
        let identity = DumpIdentity::new(
            loaded.stem.as_str(),
            &object.display_name,
            object.path_id,
            format,
        );
        let path = fs::parent_of(&loaded.path).join(identity.file_name());

        let contents = match render(workspace, object, format, serializer) {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "{} ({}) failed to deserialize: {}",
                    object.display_name,
                    object.path_id,
                    e
                );
                report.failed.push(path.clone());
                format!("{}\n", FAILED_DUMP_TEXT)
            }
        };
        log::debug!("Dumping {}", path.display());
        fs::write(&path, contents.as_bytes())?;
        report.dumps.push(path);
    }
    log::info!(
        "Wrote {} dumps ({} failed)",
        report.dumps.len(),
        report.failed.len()
    );
    Ok(report)
}

fn render(
    workspace: &Workspace,
    object: &ObjectEntry,
    format: DumpFormat,
    serializer: &dyn ObjectSerializer,
) -> Result<String> {
    let key = (object.file_id, object.path_id);
    let info = workspace.type_info(key)?;
    let data = workspace.object_data(key).unwrap_or_default();
    let field = serializer.deserialize(data, &info)?;
    match format {
        DumpFormat::Text => Ok(serializer.to_text(&field)),
        DumpFormat::Json => serializer.to_json(&field),
    }
}
