//! Embedded type trees.
//!
//! A type tree is a flattened pre-order list of nodes; a node's children are
//! the following nodes one level deeper, up to the next node at its own
//! level or shallower. Names and type names live in a string buffer, or in
//! the engine's common string table when the offset's high bit is set.

use crate::format::reader::{ByteReader, ByteWriter};
use crate::{Error, Result};

/// Offset bit selecting the common string table.
const COMMON_STRING_FLAG: u32 = 0x8000_0000;

/// Node flag marking an array.
pub const TYPE_FLAG_ARRAY: u8 = 0x1;

/// Meta flag requesting 4-byte alignment after the field.
pub const META_FLAG_ALIGN: u32 = 0x4000;

/// The engine's built-in strings, NUL-separated, in table order.
const COMMON_STRINGS: &str = "AABB\0AnimationClip\0AnimationCurve\0AnimationState\0Array\0Base\0\
BitField\0bitset\0bool\0char\0ColorRGBA\0Component\0data\0deque\0double\0dynamic_array\0\
FastPropertyName\0first\0float\0Font\0GameObject\0Generic Mono\0GradientNEW\0GUID\0GUIStyle\0\
int\0list\0long long\0map\0Matrix4x4f\0MdFour\0MonoBehaviour\0MonoScript\0m_ByteSize\0m_Curve\0\
m_EditorClassIdentifier\0m_EditorHideFlags\0m_Enabled\0m_ExtensionPtr\0m_GameObject\0m_Index\0\
m_IsArray\0m_IsStatic\0m_MetaFlag\0m_Name\0m_ObjectHideFlags\0m_PrefabInternal\0\
m_PrefabParentObject\0m_Script\0m_StaticEditorFlags\0m_Type\0m_Version\0Object\0pair\0\
PPtr<Component>\0PPtr<GameObject>\0PPtr<Material>\0PPtr<MonoBehaviour>\0PPtr<MonoScript>\0\
PPtr<Object>\0PPtr<Prefab>\0PPtr<Sprite>\0PPtr<TextAsset>\0PPtr<Texture>\0PPtr<Texture2D>\0\
PPtr<Transform>\0Prefab\0Quaternionf\0Rectf\0RectInt\0RectOffset\0second\0set\0short\0size\0\
SInt16\0SInt32\0SInt64\0SInt8\0staticvector\0string\0TextAsset\0TextMesh\0Texture\0Texture2D\0\
Transform\0TypelessData\0UInt16\0UInt32\0UInt64\0UInt8\0unsigned int\0unsigned long long\0\
unsigned short\0vector\0Vector2f\0Vector3f\0Vector4f\0m_ScriptingClassIdentifier\0Gradient\0\
Type*\0int2_storage\0int3_storage\0BoundsInt\0m_CorrespondingSourceObject\0m_PrefabInstance\0\
m_PrefabAsset\0FileSize\0Hash128\0RenderingLayerMask\0";

fn common_strings() -> impl Iterator<Item = (u32, &'static str)> {
    COMMON_STRINGS
        .split('\0')
        .filter(|s| !s.is_empty())
        .scan(0u32, |offset, s| {
            let at = *offset;
            *offset += s.len() as u32 + 1;
            Some((at, s))
        })
}

fn common_string(offset: u32) -> Option<&'static str> {
    common_strings().find(|(at, _)| *at == offset).map(|(_, s)| s)
}

fn common_offset(value: &str) -> Option<u32> {
    common_strings().find(|(_, s)| *s == value).map(|(at, _)| at)
}

/// One node of a type tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTreeNode {
    /// Field layout version.
    pub version: u16,
    /// Depth in the tree; the root is level 0.
    pub level: u8,
    /// Node flags, see [`TYPE_FLAG_ARRAY`].
    pub type_flags: u8,
    /// Type name, e.g. `string` or `PPtr<GameObject>`.
    pub type_name: String,
    /// Field name.
    pub name: String,
    /// Fixed size in bytes, or -1 for variable-size fields.
    pub byte_size: i32,
    /// Position of the node in the flattened list.
    pub index: i32,
    /// Meta flags, see [`META_FLAG_ALIGN`].
    pub meta_flag: u32,
    /// Hash of the referenced type (format version 19 and later).
    pub ref_type_hash: u64,
}

impl TypeTreeNode {
    /// Creates a node with default version and flags.
    pub fn new(level: u8, type_name: &str, name: &str, byte_size: i32) -> Self {
        Self {
            version: 1,
            level,
            type_flags: 0,
            type_name: type_name.into(),
            name: name.into(),
            byte_size,
            index: 0,
            meta_flag: 0,
            ref_type_hash: 0,
        }
    }

    /// Marks the node as an array.
    pub fn array(mut self) -> Self {
        self.type_flags |= TYPE_FLAG_ARRAY;
        self
    }

    /// Marks the node as aligned.
    pub fn aligned(mut self) -> Self {
        self.meta_flag |= META_FLAG_ALIGN;
        self
    }

    /// Returns `true` if the node is an array.
    pub fn is_array(&self) -> bool {
        self.type_flags & TYPE_FLAG_ARRAY != 0
    }

    /// Returns `true` if the stream aligns to 4 bytes after this field.
    pub fn is_aligned(&self) -> bool {
        self.meta_flag & META_FLAG_ALIGN != 0
    }
}

/// A type tree describing one serialized type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeTree {
    /// Nodes in pre-order.
    pub nodes: Vec<TypeTreeNode>,
}

impl TypeTree {
    /// Creates a tree from nodes in pre-order, renumbering their indices.
    pub fn from_nodes(nodes: Vec<TypeTreeNode>) -> Self {
        let nodes = nodes
            .into_iter()
            .enumerate()
            .map(|(i, mut node)| {
                node.index = i as i32;
                node
            })
            .collect();
        Self { nodes }
    }

    /// The root node.
    pub fn root(&self) -> Option<&TypeTreeNode> {
        self.nodes.first()
    }

    /// Indices of the direct children of node `index`.
    pub fn children(&self, index: usize) -> Vec<usize> {
        let Some(parent) = self.nodes.get(index) else {
            return Vec::new();
        };
        let child_level = parent.level + 1;
        self.nodes[index + 1..]
            .iter()
            .enumerate()
            .take_while(|(_, n)| n.level > parent.level)
            .filter(|(_, n)| n.level == child_level)
            .map(|(i, _)| index + 1 + i)
            .collect()
    }

    /// Index of the direct child of `index` named `name`.
    pub fn child_named(&self, index: usize, name: &str) -> Option<usize> {
        self.children(index)
            .into_iter()
            .find(|&i| self.nodes[i].name == name)
    }

    /// Decodes a type tree blob.
    pub(crate) fn parse(r: &mut ByteReader<'_>, version: u32) -> Result<Self> {
        let at = r.position() as u64;
        let node_count = r.read_i32()?;
        let buffer_size = r.read_i32()?;
        let node_size = if version >= 19 { 32 } else { 24 };
        if node_count < 0
            || buffer_size < 0
            || (node_count as usize).saturating_mul(node_size) > r.remaining()
        {
            return Err(Error::assets(
                at,
                format!(
                    "implausible type tree ({} nodes, {} string bytes)",
                    node_count, buffer_size
                ),
            ));
        }

        struct RawNode {
            version: u16,
            level: u8,
            type_flags: u8,
            type_offset: u32,
            name_offset: u32,
            byte_size: i32,
            index: i32,
            meta_flag: u32,
            ref_type_hash: u64,
        }

        let mut raw = Vec::with_capacity(node_count as usize);
        for _ in 0..node_count {
            raw.push(RawNode {
                version: r.read_u16()?,
                level: r.read_u8()?,
                type_flags: r.read_u8()?,
                type_offset: r.read_u32()?,
                name_offset: r.read_u32()?,
                byte_size: r.read_i32()?,
                index: r.read_i32()?,
                meta_flag: r.read_u32()?,
                ref_type_hash: if version >= 19 { r.read_u64()? } else { 0 },
            });
        }
        let strings_at = r.position() as u64;
        let strings = r.read_bytes(buffer_size as usize)?;

        let lookup = |offset: u32| -> Result<String> {
            if offset & COMMON_STRING_FLAG != 0 {
                let offset = offset & !COMMON_STRING_FLAG;
                return common_string(offset).map(str::to_string).ok_or_else(|| {
                    Error::assets(strings_at, format!("unknown common string {}", offset))
                });
            }
            let rest = strings.get(offset as usize..).ok_or_else(|| {
                Error::assets(strings_at, format!("string offset {} out of range", offset))
            })?;
            let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
            Ok(String::from_utf8_lossy(&rest[..end]).into_owned())
        };

        let mut nodes = Vec::with_capacity(raw.len());
        for node in raw {
            nodes.push(TypeTreeNode {
                version: node.version,
                level: node.level,
                type_flags: node.type_flags,
                type_name: lookup(node.type_offset)?,
                name: lookup(node.name_offset)?,
                byte_size: node.byte_size,
                index: node.index,
                meta_flag: node.meta_flag,
                ref_type_hash: node.ref_type_hash,
            });
        }
        Ok(Self { nodes })
    }

    /// Encodes the tree as a blob, using the common table where possible.
    pub(crate) fn encode(&self, w: &mut ByteWriter, version: u32) {
        let mut strings: Vec<u8> = Vec::new();
        let mut offset_of = |value: &str| -> u32 {
            if let Some(common) = common_offset(value) {
                return common | COMMON_STRING_FLAG;
            }
            let at = strings.len() as u32;
            strings.extend_from_slice(value.as_bytes());
            strings.push(0);
            at
        };
        let offsets: Vec<(u32, u32)> = self
            .nodes
            .iter()
            .map(|n| (offset_of(&n.type_name), offset_of(&n.name)))
            .collect();

        w.write_i32(self.nodes.len() as i32);
        w.write_i32(strings.len() as i32);
        for (node, (type_offset, name_offset)) in self.nodes.iter().zip(offsets) {
            w.write_u16(node.version);
            w.write_u8(node.level);
            w.write_u8(node.type_flags);
            w.write_u32(type_offset);
            w.write_u32(name_offset);
            w.write_i32(node.byte_size);
            w.write_i32(node.index);
            w.write_u32(node.meta_flag);
            if version >= 19 {
                w.write_u64(node.ref_type_hash);
            }
        }
        w.write_bytes(&strings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_asset() -> TypeTree {
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
            TypeTreeNode::new(1, "int", "m_CustomCounter", 4),
        ])
    }

    #[test]
    fn test_common_string_offsets() {
        assert_eq!(common_string(0), Some("AABB"));
        assert_eq!(common_string(5), Some("AnimationClip"));
        assert_eq!(common_offset("m_Name").and_then(common_string), Some("m_Name"));
        assert_eq!(common_offset("m_CustomCounter"), None);
    }

    #[test]
    fn test_children() {
        let tree = text_asset();
        assert_eq!(tree.children(0), vec![1, 5, 9]);
        assert_eq!(tree.children(2), vec![3, 4]);
        assert_eq!(tree.child_named(0, "m_Script"), Some(5));
        assert!(tree.children(99).is_empty());
    }

    #[test]
    fn test_blob_roundtrip_both_layouts() {
        let tree = text_asset();
        for version in [17, 22] {
            for big_endian in [false, true] {
                let mut w = ByteWriter::new(big_endian);
                tree.encode(&mut w, version);
                let blob = w.into_inner();
                let mut r = ByteReader::new(&blob, big_endian);
                let parsed = TypeTree::parse(&mut r, version).unwrap();
                assert_eq!(parsed, tree);
                assert_eq!(r.remaining(), 0);
            }
        }
    }

    #[test]
    fn test_local_strings_only_for_unknown_names() {
        let tree = text_asset();
        let mut w = ByteWriter::new(false);
        tree.encode(&mut w, 22);
        let blob = w.into_inner();
        let buffer_size = i32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]);
        assert_eq!(buffer_size as usize, "m_CustomCounter".len() + 1);
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut data = (-1i32).to_le_bytes().to_vec();
        data.extend_from_slice(&0i32.to_le_bytes());
        let err = TypeTree::parse(&mut ByteReader::new(&data, false), 22).unwrap_err();
        assert!(matches!(err, Error::AssetsParse { .. }));
    }
}
