//! Binary decoding of objects through their type trees.

use super::field::{Field, FieldValue, Primitive};
use crate::assets::TypeTree;
use crate::format::reader::ByteReader;
use crate::{Error, Result};

/// Decodes `data` as the root type of `tree`.
pub(crate) fn read_object(tree: &TypeTree, data: &[u8], big_endian: bool) -> Result<Field> {
    if tree.nodes.is_empty() {
        return Err(Error::Deserialize("empty type tree".into()));
    }
    let mut r = ByteReader::new(data, big_endian);
    let field = read_node(tree, 0, &mut r).map_err(|e| match e {
        Error::Truncated { offset, needed } => Error::Deserialize(format!(
            "object data ends at {} ({} more bytes needed)",
            offset, needed
        )),
        other => other,
    })?;
    if r.remaining() > 0 {
        log::debug!(
            "{} trailing bytes after {}",
            r.remaining(),
            tree.nodes[0].type_name
        );
    }
    Ok(field)
}

fn read_node(tree: &TypeTree, index: usize, r: &mut ByteReader<'_>) -> Result<Field> {
    let node = &tree.nodes[index];
    let children = tree.children(index);
    let mut aligned = node.is_aligned();

    let value = if node.is_array() {
        read_array(tree, index, &children, r)?
    } else if node.type_name == "string" {
        if let Some(&array) = children.first() {
            aligned |= tree.nodes[array].is_aligned();
        }
        let len = read_len(r)?;
        FieldValue::String(String::from_utf8_lossy(r.read_bytes(len)?).into_owned())
    } else if node.type_name == "TypelessData" {
        let len = read_len(r)?;
        FieldValue::Bytes(r.read_bytes(len)?.to_vec())
    } else if children.is_empty() {
        match Primitive::from_type_name(&node.type_name) {
            Some(kind) => read_primitive(kind, r)?,
            None if node.byte_size <= 0 => FieldValue::Struct(Vec::new()),
            None => {
                return Err(Error::Deserialize(format!(
                    "unknown leaf type '{}' for field '{}'",
                    node.type_name, node.name
                )));
            }
        }
    } else {
        let mut fields = Vec::with_capacity(children.len());
        for child in children {
            fields.push(read_node(tree, child, r)?);
        }
        FieldValue::Struct(fields)
    };

    if aligned {
        r.align(4)?;
    }
    Ok(Field {
        name: node.name.clone(),
        type_name: node.type_name.clone(),
        aligned,
        value,
    })
}

fn read_array(
    tree: &TypeTree,
    index: usize,
    children: &[usize],
    r: &mut ByteReader<'_>,
) -> Result<FieldValue> {
    let Some(&element) = children.get(1) else {
        return Err(Error::Deserialize(format!(
            "array '{}' has no element type",
            tree.nodes[index].name
        )));
    };
    let count = read_len(r)?;
    let element_node = &tree.nodes[element];
    let element_is_byte = tree.children(element).is_empty()
        && Primitive::from_type_name(&element_node.type_name) == Some(Primitive::UInt8);
    if element_is_byte {
        return Ok(FieldValue::Bytes(r.read_bytes(count)?.to_vec()));
    }

    let mut items = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        items.push(read_node(tree, element, r)?);
    }
    Ok(FieldValue::Array(items))
}

fn read_len(r: &mut ByteReader<'_>) -> Result<usize> {
    let at = r.position();
    let len = r.read_i32()?;
    if len < 0 || len as usize > r.remaining() {
        return Err(Error::Deserialize(format!(
            "implausible length {} at offset {}",
            len, at
        )));
    }
    Ok(len as usize)
}

fn read_primitive(kind: Primitive, r: &mut ByteReader<'_>) -> Result<FieldValue> {
    Ok(match kind {
        Primitive::Bool => FieldValue::Bool(r.read_bool()?),
        Primitive::SInt8 => FieldValue::SInt8(r.read_i8()?),
        Primitive::UInt8 => FieldValue::UInt8(r.read_u8()?),
        Primitive::SInt16 => FieldValue::SInt16(r.read_i16()?),
        Primitive::UInt16 => FieldValue::UInt16(r.read_u16()?),
        Primitive::SInt32 => FieldValue::SInt32(r.read_i32()?),
        Primitive::UInt32 => FieldValue::UInt32(r.read_u32()?),
        Primitive::SInt64 => FieldValue::SInt64(r.read_i64()?),
        Primitive::UInt64 => FieldValue::UInt64(r.read_u64()?),
        Primitive::Float => FieldValue::Float(r.read_f32()?),
        Primitive::Double => FieldValue::Double(r.read_f64()?),
    })
}
