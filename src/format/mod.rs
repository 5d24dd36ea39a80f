//! UnityFS bundle format constants, definitions, and low-level parsing utilities.
//!
//! A UnityFS bundle is laid out as:
//!
//! ```text
//! +---------------------------+
//! | header (big-endian)       |  signature, versions, sizes, flags
//! +---------------------------+
//! | padding to 16 (v7+)       |
//! +---------------------------+
//! | blocks info (compressed)  |  hash, block table, entry directory
//! +---------------------------+
//! | block data                |  concatenated (compressed) blocks
//! +---------------------------+
//! ```
//!
//! When [`flags::BLOCKS_INFO_AT_END`] is set the blocks info is stored after
//! the block data instead. Entry offsets in the directory are relative to the
//! start of the *decompressed* block data.

pub mod detect;
pub mod directory;
pub mod header;
pub mod reader;

pub use detect::{FileKind, detect_file_kind, detect_path};
pub use directory::{BlockInfo, BlocksInfo, DirectoryEntry};
pub use header::BundleHeader;

/// The UnityFS signature, without its terminating NUL.
pub const SIGNATURE: &str = "UnityFS";

/// Alignment applied after the header for format version 7 and later.
pub const HEADER_ALIGNMENT: u64 = 16;

/// Chunk size Unity uses for LZ4-compressed blocks.
pub const LZ4_CHUNK_SIZE: usize = 0x20000;

/// Size of the hash at the start of the blocks info.
pub const BLOCKS_INFO_HASH_SIZE: usize = 16;

/// Bundle header flags.
pub mod flags {
    /// Mask selecting the compression kind of the blocks info.
    pub const COMPRESSION_MASK: u32 = 0x3F;
    /// Blocks and directory are stored together.
    pub const HAS_DIRECTORY_INFO: u32 = 0x40;
    /// The blocks info is stored at the end of the file.
    pub const BLOCKS_INFO_AT_END: u32 = 0x80;
    /// Legacy web plugin compatibility.
    pub const OLD_WEB_PLUGIN_COMPAT: u32 = 0x100;
    /// The block data starts on a 16-byte boundary after the blocks info.
    pub const BLOCKS_INFO_PADDING: u32 = 0x200;
}

/// Per-block flags.
pub mod block_flags {
    /// Mask selecting the compression kind of the block.
    pub const COMPRESSION_MASK: u16 = 0x3F;
    /// Block is part of a streamed bundle.
    pub const STREAMED: u16 = 0x40;
}

/// Directory entry flags.
pub mod entry_flags {
    /// The entry holds a serialized (assets) file.
    pub const SERIALIZED_FILE: u32 = 0x4;
}

/// Rounds `value` up to the next multiple of `alignment`.
pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}
