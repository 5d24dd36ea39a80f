//! The JSON dump format.
//!
//! Structs become objects keyed by field name in declaration order, arrays
//! become JSON arrays, so a `vector` field reads as `{"Array": [...]}`. Byte
//! arrays are arrays of numbers. Non-finite floats are written as the
//! strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
//!
//! Importing walks the object's type tree, so field order and alignment come
//! from the tree and only values are taken from the document.

use serde_json::{Map, Number, Value};

use super::field::{Field, FieldValue, Primitive};
use crate::assets::TypeTree;
use crate::{Error, Result};

/// Renders a field tree as pretty-printed JSON.
pub(crate) fn to_json(field: &Field) -> Result<String> {
    serde_json::to_string_pretty(&to_value(field))
        .map_err(|e| Error::Deserialize(format!("cannot render JSON: {}", e)))
}

fn to_value(field: &Field) -> Value {
    match &field.value {
        FieldValue::Bool(v) => Value::Bool(*v),
        FieldValue::SInt8(v) => Value::from(*v),
        FieldValue::UInt8(v) => Value::from(*v),
        FieldValue::SInt16(v) => Value::from(*v),
        FieldValue::UInt16(v) => Value::from(*v),
        FieldValue::SInt32(v) => Value::from(*v),
        FieldValue::UInt32(v) => Value::from(*v),
        FieldValue::SInt64(v) => Value::from(*v),
        FieldValue::UInt64(v) => Value::from(*v),
        FieldValue::Float(v) => float_value(f64::from(*v)),
        FieldValue::Double(v) => float_value(*v),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Bytes(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        FieldValue::Array(items) => Value::Array(items.iter().map(to_value).collect()),
        FieldValue::Struct(children) => {
            let mut map = Map::with_capacity(children.len());
            for child in children {
                map.insert(child.name.clone(), to_value(child));
            }
            Value::Object(map)
        }
    }
}

fn float_value(v: f64) -> Value {
    match Number::from_f64(v) {
        Some(n) => Value::Number(n),
        None if v.is_nan() => Value::String("NaN".into()),
        None if v > 0.0 => Value::String("Infinity".into()),
        None => Value::String("-Infinity".into()),
    }
}

/// Builds a field tree for the root of `tree` from a JSON document.
pub(crate) fn from_json(text: &str, tree: &TypeTree) -> Result<Field> {
    if tree.nodes.is_empty() {
        return Err(Error::Deserialize("empty type tree".into()));
    }
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::Deserialize(format!("invalid JSON: {}", e)))?;
    build(tree, 0, &value, &tree.nodes[0].name)
}

fn build(tree: &TypeTree, index: usize, value: &Value, path: &str) -> Result<Field> {
    let node = &tree.nodes[index];
    let children = tree.children(index);
    let mut aligned = node.is_aligned();

    let value = if node.is_array() {
        let items = value
            .as_array()
            .ok_or_else(|| mismatch(path, "an array", value))?;
        let element = *children
            .get(1)
            .ok_or_else(|| Error::Deserialize(format!("{}: array has no element type", path)))?;
        let element_node = &tree.nodes[element];
        if tree.children(element).is_empty()
            && Primitive::from_type_name(&element_node.type_name) == Some(Primitive::UInt8)
        {
            FieldValue::Bytes(bytes(items, path)?)
        } else {
            let mut fields = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                fields.push(build(tree, element, item, &format!("{}[{}]", path, i))?);
            }
            FieldValue::Array(fields)
        }
    } else if node.type_name == "string" {
        if let Some(&array) = children.first() {
            aligned |= tree.nodes[array].is_aligned();
        }
        let s = value
            .as_str()
            .ok_or_else(|| mismatch(path, "a string", value))?;
        FieldValue::String(s.to_string())
    } else if node.type_name == "TypelessData" {
        let items = value
            .as_array()
            .ok_or_else(|| mismatch(path, "an array of bytes", value))?;
        FieldValue::Bytes(bytes(items, path)?)
    } else if children.is_empty() {
        match Primitive::from_type_name(&node.type_name) {
            Some(kind) => primitive(kind, value, path)?,
            None => FieldValue::Struct(Vec::new()),
        }
    } else {
        let object = value
            .as_object()
            .ok_or_else(|| mismatch(path, "an object", value))?;
        let mut fields = Vec::with_capacity(children.len());
        for child in children {
            let name = &tree.nodes[child].name;
            let child_path = format!("{}.{}", path, name);
            let child_value = object
                .get(name)
                .ok_or_else(|| Error::Deserialize(format!("{}: missing field", child_path)))?;
            fields.push(build(tree, child, child_value, &child_path)?);
        }
        FieldValue::Struct(fields)
    };

    Ok(Field {
        name: node.name.clone(),
        type_name: node.type_name.clone(),
        aligned,
        value,
    })
}

fn bytes(items: &[Value], path: &str) -> Result<Vec<u8>> {
    items
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| mismatch(path, "a byte", v))
        })
        .collect()
}

fn primitive(kind: Primitive, value: &Value, path: &str) -> Result<FieldValue> {
    fn int<T: TryFrom<i64> + TryFrom<u64>>(value: &Value, path: &str) -> Result<T> {
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(|v| <T as TryFrom<i64>>::try_from(v).ok())
                .or_else(|| {
                    n.as_u64()
                        .and_then(|v| <T as TryFrom<u64>>::try_from(v).ok())
                }),
            _ => None,
        };
        parsed.ok_or_else(|| mismatch(path, "an integer in range", value))
    }

    Ok(match kind {
        Primitive::Bool => FieldValue::Bool(match value {
            Value::Bool(b) => *b,
            Value::Number(n) if n.as_u64() == Some(0) => false,
            Value::Number(n) if n.as_u64() == Some(1) => true,
            _ => return Err(mismatch(path, "a boolean", value)),
        }),
        Primitive::SInt8 => FieldValue::SInt8(int(value, path)?),
        Primitive::UInt8 => FieldValue::UInt8(int(value, path)?),
        Primitive::SInt16 => FieldValue::SInt16(int(value, path)?),
        Primitive::UInt16 => FieldValue::UInt16(int(value, path)?),
        Primitive::SInt32 => FieldValue::SInt32(int(value, path)?),
        Primitive::UInt32 => FieldValue::UInt32(int(value, path)?),
        Primitive::SInt64 => FieldValue::SInt64(int(value, path)?),
        Primitive::UInt64 => FieldValue::UInt64(int(value, path)?),
        Primitive::Float => FieldValue::Float(float(value, path)? as f32),
        Primitive::Double => FieldValue::Double(float(value, path)?),
    })
}

fn float(value: &Value, path: &str) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
    .ok_or_else(|| mismatch(path, "a number", value))
}

fn mismatch(path: &str, expected: &str, found: &Value) -> Error {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    Error::Deserialize(format!("{}: expected {}, found {}", path, expected, found))
}
