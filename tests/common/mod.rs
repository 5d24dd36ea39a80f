//! Shared test utilities for integration tests.
//!
//! Builds serialized files and bundles in memory so tests never depend on
//! game data.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use bundlepatch::Compression;
use bundlepatch::assets::{SerializedFile, SerializedFileBuilder, TypeTree, TypeTreeNode};
use bundlepatch::read::Bundle;
use bundlepatch::typetree::{ObjectSerializer, TypeInfo, TypeTreeSerializer};
use bundlepatch::write::{BundleBuilder, pack_bundle};

/// Entry flag marking a serialized file.
pub const SERIALIZED: u32 = 4;

/// Path id of the unnamed `MonoBehaviour` in [`ui_assets`].
pub const BEHAVIOUR_ID: i64 = -5415249613762791440;
/// Path id of the `TextAsset` named "notes" in [`ui_assets`].
pub const NOTES_ID: i64 = 3;
/// Path id of the undecodable `TextAsset` in [`ui_assets`].
pub const BROKEN_ID: i64 = 4;

/// Name of the serialized entry in [`ui_bundle`].
pub const UI_ENTRY: &str = "CAB-ui";
/// Name of the resource entry in [`ui_bundle`].
pub const RESS_ENTRY: &str = "CAB-ui.resS";
/// Contents of [`RESS_ENTRY`].
pub const RESS_DATA: &[u8] = b"texture bytes";

fn string(level: u8, name: &str) -> Vec<TypeTreeNode> {
    vec![
        TypeTreeNode::new(level, "string", name, -1),
        TypeTreeNode::new(level + 1, "Array", "Array", -1).array().aligned(),
        TypeTreeNode::new(level + 2, "int", "size", 4),
        TypeTreeNode::new(level + 2, "char", "data", 1),
    ]
}

fn pptr(level: u8, type_name: &str, name: &str) -> Vec<TypeTreeNode> {
    vec![
        TypeTreeNode::new(level, type_name, name, 12),
        TypeTreeNode::new(level + 1, "int", "m_FileID", 4),
        TypeTreeNode::new(level + 1, "SInt64", "m_PathID", 8),
    ]
}

fn tree(root: &str, parts: Vec<Vec<TypeTreeNode>>) -> TypeTree {
    let mut nodes = vec![TypeTreeNode::new(0, root, "Base", -1)];
    nodes.extend(parts.into_iter().flatten());
    TypeTree::from_nodes(nodes)
}

pub fn text_asset_tree() -> TypeTree {
    tree("TextAsset", vec![string(1, "m_Name"), string(1, "m_Script")])
}

pub fn mono_script_tree() -> TypeTree {
    tree("MonoScript", vec![string(1, "m_Name"), string(1, "m_ClassName")])
}

pub fn mono_behaviour_tree() -> TypeTree {
    tree(
        "MonoBehaviour",
        vec![
            pptr(1, "PPtr<MonoScript>", "m_Script"),
            string(1, "m_Name"),
            vec![TypeTreeNode::new(1, "float", "m_FontSize", 4)],
        ],
    )
}

pub fn asset_bundle_tree() -> TypeTree {
    let mut container = vec![
        TypeTreeNode::new(1, "map", "m_Container", -1),
        TypeTreeNode::new(2, "Array", "Array", -1).array(),
        TypeTreeNode::new(3, "int", "size", 4),
        TypeTreeNode::new(3, "pair", "data", -1),
    ];
    container.extend(string(4, "first"));
    container.extend([
        TypeTreeNode::new(4, "AssetInfo", "second", -1),
        TypeTreeNode::new(5, "int", "preloadIndex", 4),
        TypeTreeNode::new(5, "int", "preloadSize", 4),
    ]);
    container.extend(pptr(5, "PPtr<Object>", "asset"));
    tree("AssetBundle", vec![string(1, "m_Name"), container])
}

pub fn resource_manager_tree() -> TypeTree {
    let mut container = vec![
        TypeTreeNode::new(1, "vector", "m_Container", -1),
        TypeTreeNode::new(2, "Array", "Array", -1).array(),
        TypeTreeNode::new(3, "int", "size", 4),
        TypeTreeNode::new(3, "pair", "data", -1),
    ];
    container.extend(string(4, "first"));
    container.extend(pptr(4, "PPtr<Object>", "second"));
    tree("ResourceManager", vec![container])
}

/// Encodes a JSON document as object bytes of `tree`.
pub fn encode(tree: &TypeTree, json: &str) -> Vec<u8> {
    let info = TypeInfo {
        tree,
        big_endian: false,
    };
    TypeTreeSerializer
        .from_json(json, &info)
        .expect("fixture JSON matches its tree")
}

/// A serialized file with:
///
/// - an `AssetBundle` (path id 1) listing "assets/ui/notes.txt" for object 3;
/// - a `MonoScript` "Hud" (2) with class name "TextMeshProUGUI";
/// - an unnamed `MonoBehaviour` ([`BEHAVIOUR_ID`]) using that script;
/// - a `TextAsset` "notes" ([`NOTES_ID`]) holding `notes`;
/// - a `TextAsset` ([`BROKEN_ID`]) whose bytes do not decode.
pub fn ui_assets(notes: &str) -> Vec<u8> {
    let bundle = asset_bundle_tree();
    let script = mono_script_tree();
    let behaviour = mono_behaviour_tree();
    let text = text_asset_tree();

    let mut builder = SerializedFileBuilder::new(22).unity_version("2021.3.16f1");
    let bundle_type = builder.add_type(142, Some(bundle.clone()));
    let script_type = builder.add_type(115, Some(script.clone()));
    let behaviour_type = builder.add_script_type(0, Some(behaviour.clone()));
    let text_type = builder.add_type(49, Some(text.clone()));
    builder.add_script(0, 2);

    builder.add_object(
        1,
        bundle_type,
        encode(
            &bundle,
            r#"{"m_Name": "ui", "m_Container": {"Array": [
                {"first": "assets/ui/notes.txt",
                 "second": {"preloadIndex": 0, "preloadSize": 0,
                            "asset": {"m_FileID": 0, "m_PathID": 3}}}
            ]}}"#,
        ),
    );
    builder.add_object(
        2,
        script_type,
        encode(&script, r#"{"m_Name": "Hud", "m_ClassName": "TextMeshProUGUI"}"#),
    );
    builder.add_object(
        BEHAVIOUR_ID,
        behaviour_type,
        encode(
            &behaviour,
            r#"{"m_Script": {"m_FileID": 0, "m_PathID": 2}, "m_Name": "", "m_FontSize": 24.0}"#,
        ),
    );
    let notes_json = serde_json::json!({"m_Name": "notes", "m_Script": notes}).to_string();
    builder.add_object(NOTES_ID, text_type, encode(&text, &notes_json));
    builder.add_object(BROKEN_ID, text_type, vec![0xFF; 3]);

    builder.build().expect("valid serialized file")
}

/// A serialized file with a `ResourceManager` (path id 1) listing
/// "resources/credits" for the `TextAsset` "credits" (2).
pub fn resource_assets() -> Vec<u8> {
    let manager = resource_manager_tree();
    let text = text_asset_tree();

    let mut builder = SerializedFileBuilder::new(22).unity_version("2021.3.16f1");
    let manager_type = builder.add_type(147, Some(manager.clone()));
    let text_type = builder.add_type(49, Some(text.clone()));
    builder.add_object(
        1,
        manager_type,
        encode(
            &manager,
            r#"{"m_Container": {"Array": [
                {"first": "resources/credits", "second": {"m_FileID": 0, "m_PathID": 2}}
            ]}}"#,
        ),
    );
    builder.add_object(
        2,
        text_type,
        encode(&text, r#"{"m_Name": "credits", "m_Script": "thanks"}"#),
    );
    builder.build().expect("valid serialized file")
}

/// Builds a bundle from `(name, flags, data)` entries, optionally compressed.
pub fn bundle_bytes(entries: Vec<(&str, u32, Vec<u8>)>, compression: Option<Compression>) -> Vec<u8> {
    let mut builder = BundleBuilder::new("2021.3.16f1");
    for (name, flags, data) in entries {
        builder.add_entry(name, flags, data).expect("unique entry names");
    }
    let plain = builder.build().expect("bundle builds");
    match compression {
        None | Some(Compression::None) => plain,
        Some(kind) => {
            let mut bundle = Bundle::open(Cursor::new(plain)).expect("built bundle opens");
            let mut out = Vec::new();
            pack_bundle(&mut bundle, kind, &mut out).expect("bundle packs");
            out
        }
    }
}

/// A bundle holding [`ui_assets`] and a resource entry.
pub fn ui_bundle(notes: &str, compression: Option<Compression>) -> Vec<u8> {
    bundle_bytes(
        vec![
            (UI_ENTRY, SERIALIZED, ui_assets(notes)),
            (RESS_ENTRY, 0, RESS_DATA.to_vec()),
        ],
        compression,
    )
}

/// The compression used for "compressed" fixtures in this build.
pub fn compressed() -> Option<Compression> {
    if cfg!(feature = "lz4") {
        Some(Compression::Lz4Hc)
    } else if cfg!(feature = "lzma") {
        Some(Compression::Lzma)
    } else {
        None
    }
}

/// Writes `bytes` to `dir/name`.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

/// Reads an entry of a bundle on disk, decompressing in memory.
pub fn read_entry(bundle: &Path, entry: &str) -> Vec<u8> {
    let opened = Bundle::open_path(bundle).expect("bundle opens");
    let mut plain =
        bundlepatch::read::decompress_bundle(opened, &bundlepatch::read::Scratch::Memory)
            .expect("bundle decompresses");
    plain.read_entry(entry).expect("entry exists")
}

/// The `m_Script` text of TextAsset `path_id` in a serialized file.
pub fn text_asset_script(assets: Vec<u8>, path_id: i64) -> String {
    let file = SerializedFile::parse(assets).expect("assets parse");
    let object = file.object(path_id).expect("object exists");
    let info = TypeInfo::for_object(&file, path_id).expect("type tree");
    let field = TypeTreeSerializer
        .deserialize(file.object_data(object), &info)
        .expect("object decodes");
    field
        .child("m_Script")
        .and_then(|f| f.as_str())
        .expect("m_Script string")
        .to_string()
}

/// Names of the files in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("list dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
