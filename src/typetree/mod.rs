//! Object field trees and the dump codecs.
//!
//! Objects in serialized files are opaque bytes; their layout is described
//! by the type tree of their type. This module decodes objects into a
//! [`Field`] tree, encodes trees back into bytes, and renders trees as
//! editable text or JSON dumps.
//!
//! The pipeline code talks to an [`ObjectSerializer`] rather than to these
//! functions directly; [`TypeTreeSerializer`] is the implementation backed
//! by embedded type trees.
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlepatch::assets::SerializedFile;
//! use bundlepatch::typetree::{ObjectSerializer, TypeInfo, TypeTreeSerializer};
//!
//! let file = SerializedFile::open_path("CAB-1234")?;
//! let object = &file.objects[0];
//! let tree = file.type_tree_of(object).expect("type trees enabled");
//! let info = TypeInfo { tree, big_endian: file.big_endian() };
//!
//! let serializer = TypeTreeSerializer;
//! let field = serializer.deserialize(file.object_data(object), &info)?;
//! println!("{}", serializer.to_text(&field));
//! # Ok::<(), bundlepatch::Error>(())
//! ```

mod field;
mod json;
mod read;
mod text;
mod write;

pub use field::{Field, FieldValue};

use crate::assets::{SerializedFile, TypeTree};
use crate::{Error, Result};

/// What a serializer needs to know about an object's type.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo<'a> {
    /// The type tree of the object's type.
    pub tree: &'a TypeTree,
    /// Byte order of the object data.
    pub big_endian: bool,
}

impl<'a> TypeInfo<'a> {
    /// Type information for object `path_id` of `file`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`] for an unknown path id and
    /// [`Error::MissingTypeTree`] if the file carries no tree for its type.
    pub fn for_object(file: &'a SerializedFile, path_id: i64) -> Result<Self> {
        let object = file
            .object(path_id)
            .ok_or(Error::ObjectNotFound { path_id })?;
        let tree = file
            .type_tree_of(object)
            .ok_or(Error::MissingTypeTree {
                class_id: object.class_id,
            })?;
        Ok(Self {
            tree,
            big_endian: file.big_endian(),
        })
    }
}

/// Converts objects between bytes, field trees and dump documents.
pub trait ObjectSerializer: Send + Sync {
    /// Decodes object bytes.
    fn deserialize(&self, data: &[u8], info: &TypeInfo<'_>) -> Result<Field>;

    /// Encodes a field tree.
    fn serialize(&self, field: &Field, big_endian: bool) -> Result<Vec<u8>>;

    /// Renders a field tree as a text dump.
    fn to_text(&self, field: &Field) -> String;

    /// Decodes a text dump into object bytes.
    fn from_text(&self, text: &str, info: &TypeInfo<'_>) -> Result<Vec<u8>>;

    /// Renders a field tree as a JSON dump.
    fn to_json(&self, field: &Field) -> Result<String>;

    /// Decodes a JSON dump into object bytes.
    fn from_json(&self, text: &str, info: &TypeInfo<'_>) -> Result<Vec<u8>>;
}

/// The [`ObjectSerializer`] driven by embedded type trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeTreeSerializer;

impl ObjectSerializer for TypeTreeSerializer {
    fn deserialize(&self, data: &[u8], info: &TypeInfo<'_>) -> Result<Field> {
        read::read_object(info.tree, data, info.big_endian)
    }

    fn serialize(&self, field: &Field, big_endian: bool) -> Result<Vec<u8>> {
        Ok(write::write_object(field, big_endian))
    }

    fn to_text(&self, field: &Field) -> String {
        text::to_text(field)
    }

    /// The dump carries every type name and alignment flag itself; the
    /// type tree is only used to check that the dump is for the right type.
    fn from_text(&self, text: &str, info: &TypeInfo<'_>) -> Result<Vec<u8>> {
        let field = text::from_text(text)?;
        if let Some(root) = info.tree.root() {
            if root.type_name != field.type_name {
                return Err(Error::Deserialize(format!(
                    "dump is a {}, object is a {}",
                    field.type_name, root.type_name
                )));
            }
        }
        self.serialize(&field, info.big_endian)
    }

    fn to_json(&self, field: &Field) -> Result<String> {
        json::to_json(field)
    }

    fn from_json(&self, text: &str, info: &TypeInfo<'_>) -> Result<Vec<u8>> {
        let field = json::from_json(text, info.tree)?;
        self.serialize(&field, info.big_endian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{SerializedFileBuilder, TypeTreeNode};
    use crate::format::reader::ByteWriter;

    fn text_asset_tree() -> TypeTree {
        TypeTree::from_nodes(vec![
            TypeTreeNode::new(0, "TextAsset", "Base", -1),
            TypeTreeNode::new(1, "string", "m_Name", -1),
            TypeTreeNode::new(2, "Array", "Array", -1).array().aligned(),
            TypeTreeNode::new(3, "int", "size", 4),
            TypeTreeNode::new(3, "char", "data", 1),
            TypeTreeNode::new(1, "string", "m_Script", -1),
            TypeTreeNode::new(2, "Array", "Array", -1).array().aligned(),
            TypeTreeNode::new(3, "int", "size", 4),
            TypeTreeNode::new(3, "char", "data", 1),
        ])
    }

    fn text_asset(name: &str, script: &str, big_endian: bool) -> Vec<u8> {
        let mut w = ByteWriter::new(big_endian);
        for s in [name, script] {
            w.write_i32(s.len() as i32);
            w.write_bytes(s.as_bytes());
            w.align(4);
        }
        w.into_inner()
    }

    fn file(big_endian: bool) -> SerializedFile {
        let mut builder = SerializedFileBuilder::new(22).big_endian(big_endian);
        let ty = builder.add_type(49, Some(text_asset_tree()));
        builder.add_object(3, ty, text_asset("notes", "hello world", big_endian));
        SerializedFile::parse(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_text_dump_roundtrip() {
        for big_endian in [false, true] {
            let file = file(big_endian);
            let info = TypeInfo::for_object(&file, 3).unwrap();
            let serializer = TypeTreeSerializer;
            let data = file.object_data(file.object(3).unwrap());

            let field = serializer.deserialize(data, &info).unwrap();
            let text = serializer.to_text(&field);
            assert!(text.contains("1 string m_Script = \"hello world\""));
            assert_eq!(serializer.from_text(&text, &info).unwrap(), data);

            let edited = text.replace("hello world", "patched");
            let bytes = serializer.from_text(&edited, &info).unwrap();
            assert_eq!(bytes, text_asset("notes", "patched", big_endian));
        }
    }

    #[test]
    fn test_json_dump_roundtrip() {
        let file = file(false);
        let info = TypeInfo::for_object(&file, 3).unwrap();
        let serializer = TypeTreeSerializer;
        let data = file.object_data(file.object(3).unwrap());

        let json = serializer
            .to_json(&serializer.deserialize(data, &info).unwrap())
            .unwrap();
        assert_eq!(serializer.from_json(&json, &info).unwrap(), data);
    }

    #[test]
    fn test_text_dump_for_other_type_rejected() {
        let file = file(false);
        let info = TypeInfo::for_object(&file, 3).unwrap();
        let err = TypeTreeSerializer
            .from_text("0 MonoBehaviour Base\n", &info)
            .unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }

    #[test]
    fn test_type_info_errors() {
        let file = file(false);
        assert!(matches!(
            TypeInfo::for_object(&file, 99),
            Err(Error::ObjectNotFound { path_id: 99 })
        ));
    }
}
