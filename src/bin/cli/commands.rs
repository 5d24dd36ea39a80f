//! Command implementations for the CLI tool.

use std::path::Path;

use bundlepatch::read::Bundle;
use bundlepatch::session::ScratchOptions;
use bundlepatch::{
    BatchExportOptions, Compression, DumpFilter, DumpFormat, ImportDumpsOptions, InstallOptions,
    Session,
};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;

/// Configuration for the export-dumps command.
pub struct ExportDumpsConfig<'a> {
    pub bundle: &'a Path,
    pub names: &'a [String],
    pub dump_format: DumpFormat,
    pub scratch: ScratchOptions,
    pub format: OutputFormat,
}

/// Configuration for the import-dumps command.
pub struct ImportDumpsConfig<'a> {
    pub bundle: &'a Path,
    pub recompress: Option<Compression>,
    pub delete: bool,
    pub scratch: ScratchOptions,
    pub format: OutputFormat,
}

fn filter_for(names: &[String]) -> DumpFilter {
    if names.is_empty() {
        DumpFilter::All
    } else {
        DumpFilter::NameContains(names.to_vec())
    }
}

fn fail(error: &bundlepatch::Error) -> ExitCode {
    eprintln!("Error: {}", error);
    error_to_exit_code(error)
}

/// Batch export command implementation
pub fn batch_export(
    directory: &Path,
    keep_names: bool,
    scratch: ScratchOptions,
    format: OutputFormat,
) -> ExitCode {
    let session = Session::new().with_scratch(scratch);
    let options = BatchExportOptions::new().keep_original_names(keep_names);
    match session.batch_export(directory, &options) {
        Ok(report) => {
            print!("{}", create_formatter(format).format_batch("Exported", &report));
            if report.has_failures() {
                ExitCode::Partial
            } else {
                ExitCode::Success
            }
        }
        Err(e) => fail(&e),
    }
}

/// Batch import command implementation
pub fn batch_import(directory: &Path, scratch: ScratchOptions, format: OutputFormat) -> ExitCode {
    let session = Session::new().with_scratch(scratch);
    match session.batch_import(directory) {
        Ok(report) => {
            print!("{}", create_formatter(format).format_batch("Imported", &report));
            if report.has_failures() {
                ExitCode::Partial
            } else {
                ExitCode::Success
            }
        }
        Err(e) => fail(&e),
    }
}

/// Apply-patch command implementation
pub fn apply_patch(
    manifest: &Path,
    root: &Path,
    staged: bool,
    scratch: ScratchOptions,
    format: OutputFormat,
) -> ExitCode {
    let session = Session::new().with_scratch(scratch);
    let options = InstallOptions::new().staged_commit(staged);
    match session.apply_patch(manifest, root, &options) {
        Ok(report) => {
            print!("{}", create_formatter(format).format_install(&report));
            ExitCode::Success
        }
        Err(e) => {
            if let bundlepatch::Error::InstallAborted { installed, .. } = &e {
                if *installed > 0 {
                    eprintln!("{} file(s) were installed before the failure", installed);
                }
            }
            fail(&e)
        }
    }
}

/// Export-dumps command implementation
pub fn export_dumps(config: &ExportDumpsConfig<'_>) -> ExitCode {
    let session = Session::new().with_scratch(config.scratch);
    let filter = filter_for(config.names);
    match session.export_dumps(config.bundle, &filter, config.dump_format) {
        Ok(report) => {
            print!("{}", create_formatter(config.format).format_export(&report));
            ExitCode::Success
        }
        Err(e) => fail(&e),
    }
}

/// Import-dumps command implementation
pub fn import_dumps(config: &ImportDumpsConfig<'_>) -> ExitCode {
    let session = Session::new().with_scratch(config.scratch);
    let options = ImportDumpsOptions::new()
        .recompress(config.recompress)
        .delete_artifacts(config.delete);
    match session.import_dumps(config.bundle, &options) {
        Ok(report) => {
            print!("{}", create_formatter(config.format).format_import(&report));
            if report.failed.is_empty() {
                ExitCode::Success
            } else {
                ExitCode::Partial
            }
        }
        Err(e) => fail(&e),
    }
}

/// Info command implementation
pub fn info(bundle: &Path, format: OutputFormat) -> ExitCode {
    match Bundle::open_path(bundle) {
        Ok(opened) => {
            print!("{}", create_formatter(format).format_info(bundle, &opened));
            ExitCode::Success
        }
        Err(e) => fail(&e),
    }
}

/// List command implementation
pub fn list(file: &Path, names: &[String], scratch: ScratchOptions, format: OutputFormat) -> ExitCode {
    let session = Session::new().with_scratch(scratch);
    let workspace = match session.inspect(file) {
        Ok(w) => w,
        Err(e) => return fail(&e),
    };
    let filter = filter_for(names);
    let objects: Vec<_> = workspace
        .objects()
        .filter(|o| filter.matches(&o.display_name))
        .collect();
    println!("{}", create_formatter(format).format_list(&workspace, &objects));
    ExitCode::Success
}
