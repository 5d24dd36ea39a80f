//! Fuzz target for serialized-file parsing and object decoding.
//!
//! Run with: cargo +nightly fuzz run serialized_parse

#![no_main]

use libfuzzer_sys::fuzz_target;

use bundlepatch::assets::SerializedFile;
use bundlepatch::typetree::{ObjectSerializer, TypeInfo, TypeTreeSerializer};

fuzz_target!(|data: &[u8]| {
    let Ok(file) = SerializedFile::parse(data.to_vec()) else {
        return;
    };
    for object in &file.objects {
        let Ok(info) = TypeInfo::for_object(&file, object.path_id) else {
            continue;
        };
        if let Ok(field) = TypeTreeSerializer.deserialize(file.object_data(object), &info) {
            let _ = TypeTreeSerializer.to_text(&field);
        }
    }
});
