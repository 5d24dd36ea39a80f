//! Serialized (assets) files.
//!
//! A serialized file holds a metadata block (type table, object table,
//! script and external references) followed by a data region with the raw
//! bytes of every object:
//!
//! ```text
//! +---------------------------+
//! | header (big-endian)       |  20 bytes, 48 from version 22
//! +---------------------------+
//! | metadata (file endian)    |  types, objects, scripts, externals
//! +---------------------------+
//! | padding                   |
//! +---------------------------+
//! | object data               |  starts at data_offset
//! +---------------------------+
//! ```
//!
//! [`SerializedFile`] parses versions 14 and later. Rewriting keeps every
//! metadata byte except the object table, so type trees and references are
//! preserved exactly.

mod builder;
pub mod class_id;
mod serialized;
mod type_tree;
mod writer;

pub use builder::SerializedFileBuilder;
pub use serialized::{
    ExternalRef, LARGE_FILES_VERSION, MIN_VERSION, ObjectInfo, ScriptRef, SerializedFile,
    SerializedHeader, SerializedType,
};
pub use type_tree::{META_FLAG_ALIGN, TYPE_FLAG_ARRAY, TypeTree, TypeTreeNode};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::edit::{RegionSource, Replacer, ReplacerSet};

    fn named_tree(class: &str) -> TypeTree {
        TypeTree::from_nodes(vec![
            TypeTreeNode::new(0, class, "Base", -1),
            TypeTreeNode::new(1, "string", "m_Name", -1),
            TypeTreeNode::new(2, "Array", "Array", -1).array().aligned(),
            TypeTreeNode::new(3, "int", "size", 4),
            TypeTreeNode::new(3, "char", "data", 1),
        ])
    }

    fn sample(version: u32, big_endian: bool) -> Vec<u8> {
        let mut builder = SerializedFileBuilder::new(version).big_endian(big_endian);
        let text = builder.add_type(49, Some(named_tree("TextAsset")));
        let script = builder.add_script_type(0, Some(named_tree("MonoBehaviour")));
        builder.add_object(1, text, vec![1, 2, 3]);
        builder.add_object(-5415249613762791440, script, vec![4; 10]);
        builder.add_object(7, text, vec![5; 5]);
        builder.add_script(1, 11500000);
        builder.add_external("archive:/CAB-other/CAB-other");
        builder.build().unwrap()
    }

    #[test]
    fn test_parse_builder_output() {
        for version in [17, 21, 22] {
            for big_endian in [false, true] {
                let file = SerializedFile::parse(sample(version, big_endian)).unwrap();
                assert_eq!(file.version(), version);
                assert_eq!(file.big_endian(), big_endian);
                assert!(file.enable_type_tree);
                assert_eq!(file.types.len(), 2);
                assert_eq!(file.objects.len(), 3);
                assert_eq!(file.scripts, vec![ScriptRef { file_index: 1, path_id: 11500000 }]);
                assert_eq!(file.external_file_name(1), Some("CAB-other"));
                assert_eq!(file.external_file_name(0), None);

                let object = file.object(-5415249613762791440).unwrap();
                assert_eq!(object.class_id, 114);
                assert_eq!(file.object_data(object), &[4; 10]);
                let tree = file.type_tree_of(object).unwrap();
                assert_eq!(tree.root().unwrap().type_name, "MonoBehaviour");
            }
        }
    }

    #[test]
    fn test_rewrite_without_replacers_is_identity() {
        for version in [17, 22] {
            let bytes = sample(version, false);
            let file = SerializedFile::parse(bytes.clone()).unwrap();
            assert_eq!(file.to_bytes_with(&ReplacerSet::new()).unwrap(), bytes);
        }
    }

    #[test]
    fn test_rewrite_resizes_objects() {
        for version in [17, 22] {
            let file = SerializedFile::parse(sample(version, false)).unwrap();
            let mut replacers = ReplacerSet::new();
            replacers
                .insert(1, Replacer::FromBuffer(vec![9; 21]))
                .unwrap();
            replacers
                .insert(
                    7,
                    Replacer::FromRegion {
                        source: RegionSource::Original,
                        offset: 0,
                        length: 2,
                    },
                )
                .unwrap();

            let bytes = file.to_bytes_with(&replacers).unwrap();
            let rewritten = SerializedFile::parse(bytes.clone()).unwrap();
            assert_eq!(rewritten.header.file_size, bytes.len() as u64);
            assert_eq!(rewritten.header.metadata_size, file.header.metadata_size);
            assert_eq!(rewritten.types, file.types);

            let first = rewritten.object(1).unwrap();
            assert_eq!(rewritten.object_data(first), &[9; 21]);
            let second = rewritten.object(-5415249613762791440).unwrap();
            assert_eq!(second.byte_start % 8, 0);
            assert_eq!(rewritten.object_data(second), &[4; 10]);
            let third = rewritten.object(7).unwrap();
            assert_eq!(rewritten.object_data(third), &[1, 2]);
        }
    }

    #[test]
    fn test_unknown_path_id_rejected() {
        let file = SerializedFile::parse(sample(22, false)).unwrap();
        let mut replacers = ReplacerSet::new();
        replacers.insert(404, Replacer::CopyOriginal).unwrap();
        let err = file.to_bytes_with(&replacers).unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { path_id: 404 }));
    }

    #[test]
    fn test_old_versions_rejected() {
        let mut bytes = sample(17, false);
        bytes[8..12].copy_from_slice(&9u32.to_be_bytes());
        let err = SerializedFile::parse(bytes).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 9 }));
    }

    #[test]
    fn test_data_offset_inside_metadata_rejected() {
        let mut old = sample(17, false);
        old[12..16].copy_from_slice(&0u32.to_be_bytes());
        let mut large = sample(22, false);
        large[32..40].copy_from_slice(&0i64.to_be_bytes());

        for bytes in [old, large] {
            let err = SerializedFile::parse(bytes).unwrap_err();
            assert!(matches!(err, Error::AssetsParse { .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_truncated_metadata_is_parse_error() {
        let bytes = sample(22, false);
        let err = SerializedFile::parse(bytes[..60].to_vec()).unwrap_err();
        assert!(err.is_parse_error());
    }
}
