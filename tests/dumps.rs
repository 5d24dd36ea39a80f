//! Dump export and import through a session.

use bundlepatch::dump::{DumpFilter, DumpFormat, FAILED_DUMP_TEXT, ImportDumpsOptions};
use bundlepatch::session::ScratchOptions;
use bundlepatch::{Error, Session};

mod common;

use common::{BEHAVIOUR_ID, BROKEN_ID, NOTES_ID, RESS_DATA, RESS_ENTRY, UI_ENTRY};

const BUNDLE: &str = "modelist.bundle";

fn setup(notes: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_file(dir.path(), BUNDLE, &common::ui_bundle(notes, common::compressed()));
    (dir, path)
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn test_export_writes_payloads_and_named_dumps() {
    let (dir, bundle) = setup("hello");
    let report = Session::new()
        .export_dumps(&bundle, &DumpFilter::All, DumpFormat::Text)
        .unwrap();

    assert_eq!(report.payloads.len(), 2);
    assert_eq!(report.dumps.len(), 5);
    assert_eq!(report.failed.len(), 1);

    let names = common::file_names(dir.path());
    for expected in [
        "modelist.bundle_CAB-ui",
        "modelist.bundle_CAB-ui.resS",
        "modelist.bundle_CAB-ui-ui-1.txt",
        "modelist.bundle_CAB-ui-Hud-2.txt",
        "modelist.bundle_CAB-ui-TextMeshProUGUI--5415249613762791440.txt",
        "modelist.bundle_CAB-ui-notes-3.txt",
        "modelist.bundle_CAB-ui-TextAsset-4.txt",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {expected} in {names:?}");
    }
    assert!(!names.iter().any(|n| n.ends_with(".decomp")));

    let resource = std::fs::read(dir.path().join("modelist.bundle_CAB-ui.resS")).unwrap();
    assert_eq!(resource, RESS_DATA);

    let notes = std::fs::read_to_string(dir.path().join("modelist.bundle_CAB-ui-notes-3.txt")).unwrap();
    assert!(notes.starts_with("0 TextAsset Base"));
    assert!(notes.contains("m_Script = \"hello\""));

    let broken =
        std::fs::read_to_string(dir.path().join("modelist.bundle_CAB-ui-TextAsset-4.txt")).unwrap();
    assert_eq!(broken.trim_end(), FAILED_DUMP_TEXT);
}

#[test]
fn test_export_filter_matches_name_substrings() {
    let (_dir, bundle) = setup("hello");
    let filter = DumpFilter::NameContains(vec!["TextMesh".into(), "note".into(), "HUD".into()]);
    let report = Session::new()
        .export_dumps(&bundle, &filter, DumpFormat::Json)
        .unwrap();

    let mut names: Vec<String> = report
        .dumps
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            format!("modelist.bundle_CAB-ui-TextMeshProUGUI-{}.json", BEHAVIOUR_ID),
            format!("modelist.bundle_CAB-ui-notes-{}.json", NOTES_ID),
        ]
    );
}

#[test]
fn test_export_keeps_scratch_when_asked() {
    let Some(_) = common::compressed() else {
        return;
    };
    let (dir, bundle) = setup("hello");
    let session = Session::new().with_scratch(ScratchOptions::new().keep(true));
    session
        .export_dumps(&bundle, &DumpFilter::All, DumpFormat::Text)
        .unwrap();
    assert!(dir.path().join("modelist.bundle.decomp").is_file());
}

#[test]
fn test_export_missing_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let err = Session::new()
        .export_dumps(dir.path().join(BUNDLE), &DumpFilter::All, DumpFormat::Text)
        .unwrap_err();
    assert!(matches!(err, Error::MissingFile { .. }));
}

// =============================================================================
// Import
// =============================================================================

#[test]
fn test_edited_text_dump_round_trips_into_bundle() {
    let (dir, bundle) = setup("hello");
    let session = Session::new();
    session
        .export_dumps(&bundle, &DumpFilter::All, DumpFormat::Text)
        .unwrap();

    let dump = dir.path().join("modelist.bundle_CAB-ui-notes-3.txt");
    let edited = std::fs::read_to_string(&dump)
        .unwrap()
        .replace("\"hello\"", "\"bonjour, le monde\"");
    std::fs::write(&dump, edited).unwrap();

    let report = session.import_dumps(&bundle, &ImportDumpsOptions::new()).unwrap();
    assert!(report.applied.contains(&dump));
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("modelist.bundle_CAB-ui-TextAsset-4.txt"));
    assert!(report.ambiguous.is_empty());
    assert!(report.unmatched.is_empty());
    assert_eq!(report.output, bundle);
    assert!(!report.artifacts_deleted);

    let assets = common::read_entry(&bundle, UI_ENTRY);
    assert_eq!(common::text_asset_script(assets.clone(), NOTES_ID), "bonjour, le monde");
    assert_eq!(common::read_entry(&bundle, RESS_ENTRY), RESS_DATA);

    // The undecodable object keeps its bytes.
    let file = bundlepatch::assets::SerializedFile::parse(assets).unwrap();
    let broken = file.object(BROKEN_ID).unwrap();
    assert_eq!(file.object_data(broken), &[0xFF; 3]);
}

#[test]
fn test_edited_json_dump_with_recompression() {
    let (dir, bundle) = setup("hello");
    let session = Session::new();
    session
        .export_dumps(&bundle, &DumpFilter::NameContains(vec!["notes".into()]), DumpFormat::Json)
        .unwrap();

    let dump = dir.path().join("modelist.bundle_CAB-ui-notes-3.json");
    let mut doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
    doc["m_Script"] = serde_json::Value::String("line one\nline two".into());
    std::fs::write(&dump, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let options = ImportDumpsOptions::new().recompress(common::compressed());
    let report = session.import_dumps(&bundle, &options).unwrap();
    assert_eq!(report.applied, vec![dump]);
    assert!(report.failed.is_empty());

    let opened = bundlepatch::read::Bundle::open_path(&bundle).unwrap();
    assert_eq!(opened.is_compressed(), common::compressed().is_some());
    let assets = common::read_entry(&bundle, UI_ENTRY);
    assert_eq!(common::text_asset_script(assets, NOTES_ID), "line one\nline two");
}

#[test]
fn test_import_with_delete_removes_artifacts() {
    let (dir, bundle) = setup("hello");
    let session = Session::new();
    session
        .export_dumps(&bundle, &DumpFilter::NameContains(vec!["notes".into()]), DumpFormat::Text)
        .unwrap();

    let report = session
        .import_dumps(&bundle, &ImportDumpsOptions::new().delete_artifacts(true))
        .unwrap();
    assert!(report.artifacts_deleted);
    assert_eq!(common::file_names(dir.path()), vec![BUNDLE.to_string()]);
    let assets = common::read_entry(&bundle, UI_ENTRY);
    assert_eq!(common::text_asset_script(assets, NOTES_ID), "hello");
}

#[test]
fn test_two_dumps_for_one_object_are_ambiguous() {
    let (dir, bundle) = setup("hello");
    let session = Session::new();
    let filter = DumpFilter::NameContains(vec!["notes".into()]);
    session.export_dumps(&bundle, &filter, DumpFormat::Text).unwrap();
    session.export_dumps(&bundle, &filter, DumpFormat::Json).unwrap();

    let text_dump = dir.path().join("modelist.bundle_CAB-ui-notes-3.txt");
    let edited = std::fs::read_to_string(&text_dump).unwrap().replace("\"hello\"", "\"changed\"");
    std::fs::write(&text_dump, edited).unwrap();

    let report = session.import_dumps(&bundle, &ImportDumpsOptions::new()).unwrap();
    assert_eq!(report.ambiguous.len(), 2);
    assert!(report.applied.is_empty());
    let assets = common::read_entry(&bundle, UI_ENTRY);
    assert_eq!(common::text_asset_script(assets, NOTES_ID), "hello");
}

#[test]
fn test_dump_for_unknown_path_id_is_unmatched() {
    let (dir, bundle) = setup("hello");
    let session = Session::new();
    session
        .export_dumps(&bundle, &DumpFilter::NameContains(vec!["notes".into()]), DumpFormat::Text)
        .unwrap();
    let stray = dir.path().join("modelist.bundle_CAB-ui-ghost-999.txt");
    std::fs::copy(dir.path().join("modelist.bundle_CAB-ui-notes-3.txt"), &stray).unwrap();

    let report = session.import_dumps(&bundle, &ImportDumpsOptions::new()).unwrap();
    assert_eq!(report.unmatched, vec![stray]);
    assert_eq!(report.applied.len(), 1);
}

#[test]
fn test_dump_of_wrong_type_fails_without_aborting() {
    let (dir, bundle) = setup("hello");
    let session = Session::new();
    session
        .export_dumps(&bundle, &DumpFilter::NameContains(vec!["notes".into(), "hud".into()]), DumpFormat::Text)
        .unwrap();
    let script_dump = dir.path().join("modelist.bundle_CAB-ui-Hud-2.txt");
    let notes_dump = dir.path().join("modelist.bundle_CAB-ui-notes-3.txt");
    std::fs::copy(&script_dump, &notes_dump).unwrap();

    let report = session.import_dumps(&bundle, &ImportDumpsOptions::new()).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, notes_dump);
    assert_eq!(report.applied, vec![script_dump]);
}

#[test]
fn test_import_without_payloads() {
    let (_dir, bundle) = setup("hello");
    let err = Session::new()
        .import_dumps(&bundle, &ImportDumpsOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::NothingToImport { .. }));
    assert!(err.is_missing_input());
}
