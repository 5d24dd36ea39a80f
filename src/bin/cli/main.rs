//! CLI tool for patching Unity asset bundles.

mod commands;
mod exit_codes;
mod output;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bundlepatch::Compression;
use bundlepatch::session::ScratchOptions;
use exit_codes::ExitCode;

/// Unity asset bundle batch patcher
#[derive(Parser)]
#[command(name = "bundlepatch")]
#[command(author, version, about = "Unity asset bundle batch patcher", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log more detail (repeat for trace output)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// How compressed bundles are unpacked.
#[derive(Args, Clone, Copy)]
pub struct ScratchArgs {
    /// Keep <bundle>.decomp files after use
    #[arg(long)]
    keep_decomp: bool,

    /// Decompress again even if a <bundle>.decomp exists
    #[arg(long)]
    force_decomp: bool,

    /// Decompress in memory instead of to <bundle>.decomp
    #[arg(long, conflicts_with_all = ["keep_decomp", "force_decomp"])]
    memory: bool,
}

impl From<ScratchArgs> for ScratchOptions {
    fn from(args: ScratchArgs) -> Self {
        ScratchOptions::new()
            .keep(args.keep_decomp)
            .force(args.force_decomp)
            .memory_only(args.memory)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write every entry of every bundle in a directory next to it
    BatchExport {
        /// Directory holding the bundles
        directory: PathBuf,

        /// Name payloads after the entry alone (cannot be imported back)
        #[arg(long)]
        keep_names: bool,

        #[command(flatten)]
        scratch: ScratchArgs,
    },

    /// Write exported entries back into every bundle in a directory
    BatchImport {
        /// Directory holding the bundles and their payloads
        directory: PathBuf,

        #[command(flatten)]
        scratch: ScratchArgs,
    },

    /// Install a patch package
    ApplyPatch {
        /// Patch manifest (JSON)
        manifest: PathBuf,

        /// Game data directory the manifest paths are relative to
        #[arg(short = 'r', long, default_value = ".")]
        root: PathBuf,

        /// Stage every file before replacing any of them
        #[arg(long)]
        staged: bool,

        #[command(flatten)]
        scratch: ScratchArgs,
    },

    /// Export the objects of a bundle as editable dumps
    ExportDumps {
        /// Bundle to export
        bundle: PathBuf,

        /// Only dump objects whose name contains one of these
        #[arg(short = 'n', long = "name")]
        names: Vec<String>,

        /// Dump format
        #[arg(long, value_enum, default_value = "text")]
        dump_format: DumpFormatArg,

        #[command(flatten)]
        scratch: ScratchArgs,
    },

    /// Apply edited dumps and write them back into a bundle
    ImportDumps {
        /// Bundle the dumps were exported from
        bundle: PathBuf,

        /// Recompress the rewritten bundle
        #[arg(long, value_enum)]
        compress: Option<CompressionArg>,

        /// Delete payloads and applied dumps afterwards
        #[arg(long)]
        delete: bool,

        #[command(flatten)]
        scratch: ScratchArgs,
    },

    /// Show bundle header and entries
    Info {
        /// Bundle to inspect
        bundle: PathBuf,
    },

    /// List the objects of a bundle or serialized file
    List {
        /// Bundle or serialized file to list
        file: PathBuf,

        /// Only list objects whose name contains one of these
        #[arg(short = 'n', long = "name")]
        names: Vec<String>,

        #[command(flatten)]
        scratch: ScratchArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DumpFormatArg {
    Text,
    Json,
}

impl From<DumpFormatArg> for bundlepatch::DumpFormat {
    fn from(format: DumpFormatArg) -> Self {
        match format {
            DumpFormatArg::Text => bundlepatch::DumpFormat::Text,
            DumpFormatArg::Json => bundlepatch::DumpFormat::Json,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CompressionArg {
    Lzma,
    Lz4,
    Lz4hc,
}

impl From<CompressionArg> for Compression {
    fn from(method: CompressionArg) -> Self {
        match method {
            CompressionArg::Lzma => Compression::Lzma,
            CompressionArg::Lz4 => Compression::Lz4,
            CompressionArg::Lz4hc => Compression::Lz4Hc,
        }
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "bundlepatch=info,warn",
        (false, 1) => "bundlepatch=debug,info",
        (false, _) => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let exit_code = match cli.command {
        Commands::BatchExport {
            directory,
            keep_names,
            scratch,
        } => commands::batch_export(&directory, keep_names, scratch.into(), cli.format),

        Commands::BatchImport { directory, scratch } => {
            commands::batch_import(&directory, scratch.into(), cli.format)
        }

        Commands::ApplyPatch {
            manifest,
            root,
            staged,
            scratch,
        } => commands::apply_patch(&manifest, &root, staged, scratch.into(), cli.format),

        Commands::ExportDumps {
            bundle,
            names,
            dump_format,
            scratch,
        } => commands::export_dumps(&commands::ExportDumpsConfig {
            bundle: &bundle,
            names: &names,
            dump_format: dump_format.into(),
            scratch: scratch.into(),
            format: cli.format,
        }),

        Commands::ImportDumps {
            bundle,
            compress,
            delete,
            scratch,
        } => commands::import_dumps(&commands::ImportDumpsConfig {
            bundle: &bundle,
            recompress: compress.map(Compression::from),
            delete,
            scratch: scratch.into(),
            format: cli.format,
        }),

        Commands::Info { bundle } => commands::info(&bundle, cli.format),

        Commands::List {
            file,
            names,
            scratch,
        } => commands::list(&file, &names, scratch.into(), cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
