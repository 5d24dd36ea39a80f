//! LZMA block codec.
//!
//! A Unity LZMA block is a 5-byte properties header (props byte followed by a
//! little-endian dictionary size) and a raw LZMA stream. The uncompressed
//! size is not stored in the block; it comes from the block table.

use std::io::{Cursor, Read, Write};

use crate::{Error, Result};

/// Length of the properties header.
const PROPS_LEN: usize = 5;

/// Encoder preset used when recompressing.
const PRESET: u32 = 6;

fn codec_error(e: impl std::fmt::Display) -> Error {
    Error::Codec {
        method: "LZMA",
        reason: e.to_string(),
    }
}

/// Decodes an LZMA block of known output size.
pub fn decompress(input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    if input.len() < PROPS_LEN {
        return Err(codec_error("properties too short (need 5 bytes)"));
    }
    let props_byte = input[0];
    let dict_size = u32::from_le_bytes([input[1], input[2], input[3], input[4]]);

    let mut reader = lzma_rust2::LzmaReader::new_with_props(
        Cursor::new(&input[PROPS_LEN..]),
        uncompressed_size as u64,
        props_byte,
        dict_size,
        None,
    )
    .map_err(codec_error)?;

    // The size comes from the block table; grow towards it instead of
    // trusting it up front.
    let mut out = Vec::with_capacity(uncompressed_size.min(input.len().saturating_mul(16)));
    reader
        .take(uncompressed_size as u64)
        .read_to_end(&mut out)
        .map_err(codec_error)?;
    if out.len() != uncompressed_size {
        return Err(codec_error(format!(
            "stream ended after {} of {} bytes",
            out.len(),
            uncompressed_size
        )));
    }
    Ok(out)
}

/// Encodes an LZMA block with a properties header.
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let opts = lzma_rust2::LzmaOptions::with_preset(PRESET);

    let mut out = Vec::with_capacity(input.len() / 2 + PROPS_LEN);
    out.push(opts.get_props());
    out.extend_from_slice(&opts.dict_size.to_le_bytes());

    let mut writer =
        lzma_rust2::LzmaWriter::new_no_header(&mut out, &opts, false).map_err(codec_error)?;
    writer.write_all(input).map_err(codec_error)?;
    writer.finish().map_err(codec_error)?;
    Ok(out)
}
