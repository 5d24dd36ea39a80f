//! Building the object index from files on disk.

use bundlepatch::Session;
use bundlepatch::edit::Replacer;

mod common;

use common::{BEHAVIOUR_ID, BROKEN_ID, NOTES_ID, SERIALIZED, UI_ENTRY};

#[test]
fn test_inspect_bundle_indexes_serialized_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_file(dir.path(), "ui.bundle", &common::ui_bundle("hi", common::compressed()));

    let workspace = Session::new().inspect(&path).unwrap();
    assert_eq!(workspace.files().len(), 1);
    let loaded = &workspace.files()[0];
    assert_eq!(loaded.name, UI_ENTRY);
    assert_eq!(loaded.stem, "ui.bundle_CAB-ui");
    assert_eq!(workspace.file_id("cab-UI"), Some(0));
    assert!(!dir.path().join("ui.bundle.decomp").exists());

    let names: Vec<(i64, &str)> = workspace
        .objects_in(0)
        .map(|o| (o.path_id, o.display_name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![
            (BEHAVIOUR_ID, "TextMeshProUGUI"),
            (1, "ui"),
            (2, "Hud"),
            (NOTES_ID, "notes"),
            (BROKEN_ID, "TextAsset"),
        ]
    );

    let notes = workspace.object((0, NOTES_ID)).unwrap();
    assert_eq!(notes.class_id, 49);
    assert_eq!(notes.class_name, "TextAsset");
    assert_eq!(notes.container_path.as_deref(), Some("assets/ui/notes.txt"));
    assert!(workspace.object((0, 2)).unwrap().container_path.is_none());
}

#[test]
fn test_resource_manager_listing_is_read_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = common::bundle_bytes(
        vec![
            (UI_ENTRY, SERIALIZED, common::ui_assets("hi")),
            ("CAB-res", SERIALIZED, common::resource_assets()),
        ],
        None,
    );
    let path = common::write_file(dir.path(), "mixed.bundle", &bundle);

    let workspace = Session::new().inspect(&path).unwrap();
    assert_eq!(workspace.files().len(), 2);

    let ui = workspace.file_id(UI_ENTRY).unwrap();
    let notes = workspace.object((ui, NOTES_ID)).unwrap();
    assert_eq!(notes.container_path.as_deref(), Some("assets/ui/notes.txt"));

    let res = workspace.file_id("CAB-res").unwrap();
    let credits = workspace.object((res, 2)).unwrap();
    assert_eq!(credits.display_name, "credits");
    assert_eq!(credits.container_path.as_deref(), Some("resources/credits"));
    assert_eq!(workspace.object((res, 1)).unwrap().class_name, "ResourceManager");
}

#[test]
fn test_inspect_plain_serialized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_file(dir.path(), "level0", &common::ui_assets("plain"));

    let workspace = Session::new().inspect(&path).unwrap();
    assert_eq!(workspace.files()[0].name, "level0");
    assert_eq!(workspace.objects().count(), 5);
    let behaviour = workspace.object((0, BEHAVIOUR_ID)).unwrap();
    assert_eq!(behaviour.class_name, "MonoBehaviour");
    assert_eq!(behaviour.display_name, "TextMeshProUGUI");
}

#[test]
fn test_workspace_changes_are_written_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_file(dir.path(), "level0", &common::ui_assets("before"));
    let mut workspace = Session::new().inspect(&path).unwrap();

    let json = serde_json::json!({"m_Name": "notes", "m_Script": "after"}).to_string();
    let bytes = common::encode(&common::text_asset_tree(), &json);
    workspace
        .add_replacer((0, NOTES_ID), Replacer::FromBuffer(bytes))
        .unwrap();
    assert!(workspace.is_changed((0, NOTES_ID)));
    assert!(!workspace.is_changed((0, 2)));
    assert_eq!(workspace.changed_files(), vec![0]);

    let err = workspace
        .add_replacer((0, 999), Replacer::FromBuffer(Vec::new()))
        .unwrap_err();
    assert!(matches!(err, bundlepatch::Error::ObjectNotFound { path_id: 999 }));

    let mut out = Vec::new();
    let size = workspace.write_file(0, &mut out).unwrap();
    assert_eq!(size, out.len() as u64);
    assert_eq!(common::text_asset_script(out, NOTES_ID), "after");
}

#[test]
fn test_inspect_rejects_unknown_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_file(dir.path(), "notes.txt", b"just some text");
    let err = Session::new().inspect(&path).unwrap_err();
    assert!(err.is_parse_error());

    let err = Session::new().inspect(dir.path().join("missing")).unwrap_err();
    assert!(err.is_missing_input());
}
