//! Output formatting for CLI operations.

use serde_json::json;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use bundlepatch::batch::BatchReport;
use bundlepatch::dump::{ExportReport, ImportReport};
use bundlepatch::install::InstallReport;
use bundlepatch::read::Bundle;
use bundlepatch::workspace::{ObjectEntry, Workspace};

/// A bundle opened straight from disk
pub type OpenedBundle = Bundle<BufReader<File>>;

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the result of a batch export or import
    fn format_batch(&self, verb: &str, report: &BatchReport) -> String;

    /// Formats an installed patch
    fn format_install(&self, report: &InstallReport) -> String;

    /// Formats a dump export
    fn format_export(&self, report: &ExportReport) -> String;

    /// Formats a dump import
    fn format_import(&self, report: &ImportReport) -> String;

    /// Formats bundle header and entries
    fn format_info(&self, path: &Path, bundle: &OpenedBundle) -> String;

    /// Formats workspace objects
    fn format_list(&self, workspace: &Workspace, objects: &[&ObjectEntry]) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_batch(&self, verb: &str, report: &BatchReport) -> String {
        let mut output = String::new();
        for member in &report.processed {
            match &member.error {
                None => output.push_str(&format!(
                    "  ok      {} ({} file(s))\n",
                    member.path.display(),
                    member.outputs.len()
                )),
                Some(e) => output.push_str(&format!("  failed  {}: {}\n", member.path.display(), e)),
            }
        }
        let failed = report.failures().count();
        output.push_str(&format!(
            "{} {} bundle(s), {} failed, {} skipped\n",
            verb,
            report.processed.len() - failed,
            failed,
            report.skipped.len()
        ));
        output
    }

    fn format_install(&self, report: &InstallReport) -> String {
        let mut output = format!("Installed {}:\n", report.name);
        for file in &report.installed {
            output.push_str(&format!(
                "  {} (backup: {})\n",
                file.target.display(),
                file.backup.display()
            ));
        }
        output
    }

    fn format_export(&self, report: &ExportReport) -> String {
        let mut output = format!(
            "Exported {} payload(s), {} dump(s)\n",
            report.payloads.len(),
            report.dumps.len()
        );
        push_paths(&mut output, "Failed to deserialize", &report.failed);
        output
    }

    fn format_import(&self, report: &ImportReport) -> String {
        let mut output = format!(
            "Applied {} dump(s) to {} payload(s), wrote {}\n",
            report.applied.len(),
            report.rewritten.len(),
            report.output.display()
        );
        if !report.failed.is_empty() {
            output.push_str("\nFailed:\n");
            for (path, reason) in &report.failed {
                output.push_str(&format!("  {}: {}\n", path.display(), reason));
            }
        }
        push_paths(&mut output, "Ambiguous", &report.ambiguous);
        push_paths(&mut output, "Unmatched", &report.unmatched);
        if report.artifacts_deleted {
            output.push_str("Payloads and applied dumps deleted\n");
        }
        output
    }

    fn format_info(&self, path: &Path, bundle: &OpenedBundle) -> String {
        let header = bundle.header();
        let mut output = String::new();

        output.push_str(&format!("{}:\n", path.display()));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Format:         {}\n", header.format_version));
        output.push_str(&format!("  Engine:         {}\n", header.unity_version));
        output.push_str(&format!("  Revision:       {}\n", header.unity_revision));
        output.push_str(&format!("  File size:      {}\n", humanize_bytes(header.size.max(0) as u64)));
        output.push_str(&format!("  Data size:      {}\n", humanize_bytes(bundle.data_size())));
        output.push_str(&format!("  Compression:    {}\n", bundle.compression()));
        output.push_str(&format!("  Blocks:         {}\n", bundle.blocks().len()));

        output.push_str(&format!("\n{:>12} {:>6} {}\n", "Size", "Flags", "Entry"));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        for entry in bundle.entries() {
            output.push_str(&format!(
                "{:>12} {:>6} {}\n",
                humanize_bytes(entry.size),
                entry.flags,
                entry.name
            ));
        }
        output
    }

    fn format_list(&self, workspace: &Workspace, objects: &[&ObjectEntry]) -> String {
        let mut output = format!(
            "{:>20} {:<20} {:>10} {:<30} {}\n",
            "PathID", "Class", "Size", "Name", "Container"
        );
        output.push_str(&"-".repeat(100));
        output.push('\n');

        let mut current = None;
        for object in objects {
            if current != Some(object.file_id) {
                current = Some(object.file_id);
                if let Some(file) = workspace.file(object.file_id) {
                    output.push_str(&format!("[{}]\n", file.name));
                }
            }
            output.push_str(&format!(
                "{:>20} {:<20} {:>10} {:<30} {}\n",
                object.path_id,
                object.class_name,
                humanize_bytes(u64::from(object.byte_size)),
                object.display_name,
                object.container_path.as_deref().unwrap_or("-")
            ));
        }
        output.push_str(&"-".repeat(100));
        output.push('\n');
        output.push_str(&format!(
            "{} object(s) in {} file(s)\n",
            objects.len(),
            workspace.files().len()
        ));
        output
    }
}

fn push_paths(output: &mut String, title: &str, paths: &[PathBuf]) {
    if paths.is_empty() {
        return;
    }
    output.push_str(&format!("\n{}:\n", title));
    for path in paths {
        output.push_str(&format!("  {}\n", path.display()));
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_batch(&self, verb: &str, report: &BatchReport) -> String {
        let obj = json!({
            "command": verb.to_lowercase(),
            "success": !report.has_failures(),
            "processed": report.processed.iter().map(|m| json!({
                "path": m.path,
                "outputs": m.outputs,
                "error": m.error.as_ref().map(|e| e.to_string()),
            })).collect::<Vec<_>>(),
            "skipped": report.skipped,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_install(&self, report: &InstallReport) -> String {
        let obj = json!({
            "name": report.name,
            "installed": report.installed.iter().map(|f| json!({
                "target": f.target,
                "backup": f.backup,
            })).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_export(&self, report: &ExportReport) -> String {
        let obj = json!({
            "payloads": report.payloads,
            "dumps": report.dumps,
            "failed": report.failed,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_import(&self, report: &ImportReport) -> String {
        let obj = json!({
            "output": report.output,
            "payloads": report.payloads,
            "rewritten": report.rewritten,
            "applied": report.applied,
            "failed": report.failed.iter().map(|(p, e)| json!({"path": p, "error": e})).collect::<Vec<_>>(),
            "ambiguous": report.ambiguous,
            "unmatched": report.unmatched,
            "artifacts_deleted": report.artifacts_deleted,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_info(&self, path: &Path, bundle: &OpenedBundle) -> String {
        let header = bundle.header();
        let obj = json!({
            "path": path,
            "format_version": header.format_version,
            "unity_version": header.unity_version,
            "unity_revision": header.unity_revision,
            "size": header.size,
            "flags": header.flags,
            "data_size": bundle.data_size(),
            "compression": bundle.compression().name(),
            "blocks": bundle.blocks().len(),
            "entries": bundle.entries().iter().map(|e| json!({
                "name": e.name,
                "offset": e.offset,
                "size": e.size,
                "flags": e.flags,
            })).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_list(&self, workspace: &Workspace, objects: &[&ObjectEntry]) -> String {
        let items: Vec<_> = objects
            .iter()
            .map(|o| {
                json!({
                    "file": workspace.file(o.file_id).map(|f| f.name.as_str()),
                    "path_id": o.path_id,
                    "class_id": o.class_id,
                    "class_name": o.class_name,
                    "name": o.display_name,
                    "container": o.container_path,
                    "size": o.byte_size,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
