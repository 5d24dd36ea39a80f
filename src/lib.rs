//! # bundlepatch
//!
//! Batch patching of Unity asset bundles (UnityFS).
//!
//! The crate decompresses bundles, replaces entries and rewrites them,
//! optionally recompressing the result. It exports the objects of the
//! serialized files inside a bundle as editable text or JSON dumps and
//! imports edited dumps back, recovering each object's identity from the
//! dump's file name. Patch packages are installed file by file, each
//! original moved to a numbered backup before the patched copy takes its
//! place.
//!
//! ## Quick Start
//!
//! ### Exporting and importing dumps
//!
//! ```rust,no_run
//! use bundlepatch::{Result, Session};
//! use bundlepatch::dump::{DumpFilter, DumpFormat, ImportDumpsOptions};
//!
//! fn main() -> Result<()> {
//!     let session = Session::new();
//!
//!     // Writes modelist.bundle_<entry> payloads and one dump per object.
//!     let export = session.export_dumps("modelist.bundle", &DumpFilter::All, DumpFormat::Text)?;
//!     println!("{} dumps", export.dumps.len());
//!
//!     // ... edit the dumps ...
//!
//!     let import = session.import_dumps("modelist.bundle", &ImportDumpsOptions::new())?;
//!     println!("{} objects changed", import.applied.len());
//!     Ok(())
//! }
//! ```
//!
//! ### Rewriting a bundle
//!
//! ```rust,no_run
//! use bundlepatch::edit::{Replacer, ReplacerSet};
//! use bundlepatch::read::{Bundle, Scratch, decompress_bundle};
//! use bundlepatch::write::write_bundle;
//!
//! fn main() -> bundlepatch::Result<()> {
//!     let bundle = Bundle::open_path("level0.bundle")?;
//!     let mut bundle = decompress_bundle(bundle, &Scratch::Memory)?;
//!
//!     let mut replacers = ReplacerSet::new();
//!     replacers.insert("CAB-1.resS".to_string(), Replacer::from_file("new.resS")?)?;
//!
//!     let mut out = std::fs::File::create("level0.bundle.mod")?;
//!     let result = write_bundle(&mut bundle, &replacers, &mut out)?;
//!     println!("{} entries, {} replaced", result.entries_written, result.entries_replaced);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `lzma` | Yes | LZMA block compression |
//! | `lz4` | Yes | LZ4 and LZ4HC block compression |
//! | `parallel` | No | Batch members processed on a `rayon` thread pool |
//! | `cli` | No | The `bundlepatch` command-line tool |
//!
//! ## Logging
//!
//! The library logs through the [`log`](https://docs.rs/log) facade:
//! pipeline steps at `info`, skipped files and objects at `warn`, detail at
//! `debug`. Install any logger to see them.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod assets;
pub mod batch;
pub mod codec;
pub mod dump;
pub mod edit;
pub mod error;
pub mod format;
pub mod fs;
pub mod install;
pub mod read;
pub mod session;
pub mod typetree;
pub mod workspace;
pub mod write;

pub use error::{Error, Result};
pub use session::Session;

// Re-export the most used types at crate root for convenience
pub use batch::{BatchExportOptions, BatchReport};
pub use codec::Compression;
pub use dump::{DumpFilter, DumpFormat, ImportDumpsOptions};
pub use edit::{Replacer, ReplacerSet};
pub use install::{InstallOptions, PatchManifest};
pub use read::Bundle;
pub use session::ScratchOptions;
