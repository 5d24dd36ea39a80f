//! Binary encoding of field trees.

use super::field::{Field, FieldValue};
use crate::format::reader::ByteWriter;

/// Encodes `field` in the given byte order.
pub(crate) fn write_object(field: &Field, big_endian: bool) -> Vec<u8> {
    let mut w = ByteWriter::new(big_endian);
    write_field(field, &mut w);
    w.into_inner()
}

fn write_field(field: &Field, w: &mut ByteWriter) {
    match &field.value {
        FieldValue::Bool(v) => w.write_bool(*v),
        FieldValue::SInt8(v) => w.write_i8(*v),
        FieldValue::UInt8(v) => w.write_u8(*v),
        FieldValue::SInt16(v) => w.write_i16(*v),
        FieldValue::UInt16(v) => w.write_u16(*v),
        FieldValue::SInt32(v) => w.write_i32(*v),
        FieldValue::UInt32(v) => w.write_u32(*v),
        FieldValue::SInt64(v) => w.write_i64(*v),
        FieldValue::UInt64(v) => w.write_u64(*v),
        FieldValue::Float(v) => w.write_f32(*v),
        FieldValue::Double(v) => w.write_f64(*v),
        FieldValue::String(s) => {
            w.write_i32(s.len() as i32);
            w.write_bytes(s.as_bytes());
        }
        FieldValue::Bytes(bytes) => {
            w.write_i32(bytes.len() as i32);
            w.write_bytes(bytes);
        }
        FieldValue::Array(items) => {
            w.write_i32(items.len() as i32);
            for item in items {
                write_field(item, w);
            }
        }
        FieldValue::Struct(children) => {
            for child in children {
                write_field(child, w);
            }
        }
    }
    if field.aligned {
        w.align(4);
    }
}
