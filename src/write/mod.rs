//! Bundle writing API.
//!
//! Three ways to produce a UnityFS file:
//!
//! - [`write_bundle`] rewrites a decompressed bundle under a
//!   [`ReplacerSet`](crate::edit::ReplacerSet), streaming every entry into an
//!   uncompressed output;
//! - [`pack_bundle`] recompresses a decompressed bundle with LZ4 or LZMA;
//! - [`BundleBuilder`] assembles a new bundle from named payloads.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufWriter;
//!
//! use bundlepatch::edit::{Replacer, ReplacerSet};
//! use bundlepatch::read::{Bundle, Scratch, decompress_bundle};
//! use bundlepatch::write::write_bundle;
//!
//! let bundle = Bundle::open_path("level0.bundle")?;
//! let mut bundle = decompress_bundle(bundle, &Scratch::Memory)?;
//!
//! let mut replacers = ReplacerSet::new();
//! replacers.insert("CAB-1234".to_string(), Replacer::from_file("CAB-1234.patched")?)?;
//!
//! let mut out = BufWriter::new(File::create("level0.bundle.mod")?);
//! let result = write_bundle(&mut bundle, &replacers, &mut out)?;
//! println!("wrote {} entries, {} replaced", result.entries_written, result.entries_replaced);
//! # Ok::<(), bundlepatch::Error>(())
//! ```

mod builder;
mod pack;
mod rewrite;

pub use builder::BundleBuilder;
pub use pack::pack_bundle;
pub use rewrite::write_bundle;

/// Summary of a written bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Number of entries written.
    pub entries_written: usize,
    /// Number of entries whose content came from a replacer other than
    /// [`Replacer::CopyOriginal`](crate::edit::Replacer::CopyOriginal).
    pub entries_replaced: usize,
    /// Size of the decompressed data stream.
    pub data_size: u64,
    /// Total bytes written, header included.
    pub total_size: u64,
}

impl WriteResult {
    /// Returns the compression ratio (file size / data size).
    pub fn compression_ratio(&self) -> f64 {
        if self.data_size == 0 {
            1.0
        } else {
            self.total_size as f64 / self.data_size as f64
        }
    }
}
