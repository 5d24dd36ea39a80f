//! The decoded field tree.

/// One decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name; array elements are named `data`.
    pub name: String,
    /// Type name from the type tree.
    pub type_name: String,
    /// Whether the stream aligns to 4 bytes after this field.
    pub aligned: bool,
    /// The value.
    pub value: FieldValue,
}

/// The value of a [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// `bool`.
    Bool(bool),
    /// `SInt8`.
    SInt8(i8),
    /// `UInt8` or `char`.
    UInt8(u8),
    /// `SInt16` or `short`.
    SInt16(i16),
    /// `UInt16` or `unsigned short`.
    UInt16(u16),
    /// `SInt32` or `int`.
    SInt32(i32),
    /// `UInt32` or `unsigned int`.
    UInt32(u32),
    /// `SInt64` or `long long`.
    SInt64(i64),
    /// `UInt64`, `unsigned long long` or `FileSize`.
    UInt64(u64),
    /// `float`.
    Float(f32),
    /// `double`.
    Double(f64),
    /// `string`, decoded lossily as UTF-8.
    String(String),
    /// `TypelessData` or an array of bytes.
    Bytes(Vec<u8>),
    /// Array elements.
    Array(Vec<Field>),
    /// Child fields in declaration order.
    Struct(Vec<Field>),
}

/// Fixed-size leaf kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Primitive {
    Bool,
    SInt8,
    UInt8,
    SInt16,
    UInt16,
    SInt32,
    UInt32,
    SInt64,
    UInt64,
    Float,
    Double,
}

impl Primitive {
    /// Maps a type tree type name to its leaf kind.
    pub(crate) fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "SInt8" => Self::SInt8,
            "UInt8" | "char" => Self::UInt8,
            "short" | "SInt16" => Self::SInt16,
            "unsigned short" | "UInt16" => Self::UInt16,
            "int" | "SInt32" | "Type*" => Self::SInt32,
            "unsigned int" | "UInt32" => Self::UInt32,
            "long long" | "SInt64" => Self::SInt64,
            "unsigned long long" | "UInt64" | "FileSize" => Self::UInt64,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        })
    }
}

impl Field {
    /// Returns the direct child named `name` of a struct field.
    pub fn child(&self, name: &str) -> Option<&Field> {
        match &self.value {
            FieldValue::Struct(children) => children.iter().find(|c| c.name == name),
            _ => None,
        }
    }

    /// Mutable variant of [`child`](Self::child).
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Field> {
        match &mut self.value {
            FieldValue::Struct(children) => children.iter_mut().find(|c| c.name == name),
            _ => None,
        }
    }

    /// Follows a path of child names.
    pub fn path(&self, path: &[&str]) -> Option<&Field> {
        path.iter().try_fold(self, |field, name| field.child(name))
    }

    /// The string value, if this is a string field.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a signed integer, for any integer field that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            FieldValue::SInt8(v) => Some(i64::from(v)),
            FieldValue::UInt8(v) => Some(i64::from(v)),
            FieldValue::SInt16(v) => Some(i64::from(v)),
            FieldValue::UInt16(v) => Some(i64::from(v)),
            FieldValue::SInt32(v) => Some(i64::from(v)),
            FieldValue::UInt32(v) => Some(i64::from(v)),
            FieldValue::SInt64(v) => Some(v),
            FieldValue::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Elements of an array field, looking through a `vector`-style wrapper
    /// whose only child is the array.
    pub fn elements(&self) -> Option<&[Field]> {
        match &self.value {
            FieldValue::Array(items) => Some(items),
            FieldValue::Struct(children) if children.len() == 1 => children[0].elements(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, type_name: &str, value: FieldValue) -> Field {
        Field {
            name: name.into(),
            type_name: type_name.into(),
            aligned: false,
            value,
        }
    }

    #[test]
    fn test_navigation() {
        let pptr = leaf(
            "m_Script",
            "PPtr<MonoScript>",
            FieldValue::Struct(vec![
                leaf("m_FileID", "int", FieldValue::SInt32(1)),
                leaf("m_PathID", "SInt64", FieldValue::SInt64(-3)),
            ]),
        );
        let root = leaf(
            "Base",
            "MonoBehaviour",
            FieldValue::Struct(vec![
                leaf("m_Name", "string", FieldValue::String("Hud".into())),
                pptr,
            ]),
        );
        assert_eq!(root.child("m_Name").and_then(Field::as_str), Some("Hud"));
        assert_eq!(
            root.path(&["m_Script", "m_PathID"]).and_then(Field::as_i64),
            Some(-3)
        );
        assert!(root.path(&["m_Script", "missing"]).is_none());
    }

    #[test]
    fn test_elements_through_vector() {
        let items = vec![leaf("data", "int", FieldValue::SInt32(4))];
        let vector = leaf(
            "m_List",
            "vector",
            FieldValue::Struct(vec![leaf("Array", "Array", FieldValue::Array(items))]),
        );
        assert_eq!(vector.elements().map(<[Field]>::len), Some(1));
    }

    #[test]
    fn test_primitive_aliases() {
        assert_eq!(Primitive::from_type_name("char"), Some(Primitive::UInt8));
        assert_eq!(Primitive::from_type_name("FileSize"), Some(Primitive::UInt64));
        assert_eq!(Primitive::from_type_name("Vector3f"), None);
    }
}
