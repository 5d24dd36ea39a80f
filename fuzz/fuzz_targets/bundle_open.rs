//! Fuzz target for Bundle::open with arbitrary byte input.
//!
//! Exercises header, blocks info and block decoding with malformed input.
//!
//! Run with: cargo +nightly fuzz run bundle_open

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use bundlepatch::read::{Bundle, Scratch, decompress_bundle};

fuzz_target!(|data: &[u8]| {
    let Ok(bundle) = Bundle::open(Cursor::new(data.to_vec())) else {
        return;
    };
    let names: Vec<String> = bundle.entries().iter().map(|e| e.name.clone()).collect();
    let Ok(mut plain) = decompress_bundle(bundle, &Scratch::Memory) else {
        return;
    };
    for name in names {
        let _ = plain.read_entry(&name);
    }
});
