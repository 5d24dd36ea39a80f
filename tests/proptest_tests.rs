//! Property-based tests using proptest.
//!
//! These tests verify invariants of the bundlepatch library using randomly
//! generated inputs.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use bundlepatch::assets::SerializedFile;
use bundlepatch::dump::{DumpIdentity, MAX_TOKEN_LEN, sanitize_token};
use bundlepatch::edit::{Replacer, ReplacerSet};
use bundlepatch::install::{BACKUP_SLOTS, backup_path, next_backup_path_by};
use bundlepatch::read::Bundle;
use bundlepatch::typetree::{ObjectSerializer, TypeInfo, TypeTreeSerializer};
use bundlepatch::write::{BundleBuilder, write_bundle};
use bundlepatch::{DumpFormat, Error};

mod common;

/// Strategy for payload stems as batch export produces them.
fn stem_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_.]{1,12}(_CAB-[0-9a-f]{1,32})?"
}

fn format_strategy() -> impl Strategy<Value = DumpFormat> {
    prop_oneof![Just(DumpFormat::Text), Just(DumpFormat::Json)]
}

/// Strategy for bundle entries with distinct names.
fn entries_strategy() -> impl Strategy<Value = Vec<(String, u32, Vec<u8>)>> {
    proptest::collection::vec(
        (
            "CAB-[a-z0-9]{1,8}(\\.resS)?",
            prop_oneof![Just(0u32), Just(4u32)],
            proptest::collection::vec(any::<u8>(), 0..256),
        ),
        1..6,
    )
    .prop_map(|entries| {
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|(name, _, _)| seen.insert(name.clone()))
            .collect()
    })
}

fn build(entries: &[(String, u32, Vec<u8>)]) -> Vec<u8> {
    let mut builder = BundleBuilder::new("2021.3.16f1");
    for (name, flags, data) in entries {
        builder.add_entry(name.clone(), *flags, data.clone()).unwrap();
    }
    builder.build().unwrap()
}

proptest! {
    /// Any display name and path id survive the trip through a file name.
    #[test]
    fn dump_identity_parses_back(
        stem in stem_strategy(),
        name in any::<String>(),
        path_id in any::<i64>(),
        format in format_strategy(),
    ) {
        let id = DumpIdentity::new(stem.clone(), &name, path_id, format);
        let parsed = DumpIdentity::parse(&stem, &id.file_name());
        prop_assert_eq!(parsed, Some(id));
    }

    /// Tokens never contain a dash, are never empty and stay short.
    #[test]
    fn sanitized_tokens_are_safe(name in any::<String>()) {
        let token = sanitize_token(&name);
        prop_assert!(!token.is_empty());
        prop_assert!(!token.contains('-'));
        prop_assert!(!token.contains('/'));
        prop_assert!(token.chars().count() <= MAX_TOKEN_LEN);
    }

    /// A dump never parses under a stem it was not written for.
    #[test]
    fn dump_identity_is_bound_to_its_stem(
        stem in stem_strategy(),
        other in stem_strategy(),
        path_id in any::<i64>(),
    ) {
        prop_assume!(!stem.starts_with(&other));
        let id = DumpIdentity::new(stem, "Name", path_id, DumpFormat::Text);
        prop_assert_eq!(DumpIdentity::parse(&other, &id.file_name()), None);
    }

    /// The probe picks the lowest free slot.
    #[test]
    fn backup_probe_finds_first_free_slot(taken in proptest::collection::btree_set(0u32..64, 0..32)) {
        let target = Path::new("game/Data/level0");
        let occupied: HashSet<PathBuf> = taken.iter().map(|&s| backup_path(target, s)).collect();
        let expected = (0..).find(|s| !taken.contains(s)).unwrap();

        let found = next_backup_path_by(target, |p| occupied.contains(p)).unwrap();
        prop_assert_eq!(&found, &backup_path(target, expected));
        let suffix = format!(".bak{:04}", expected);
        prop_assert!(found.to_string_lossy().ends_with(&suffix));
    }

    /// Strings survive a text dump edit cycle unchanged.
    #[test]
    fn text_dump_preserves_strings(script in any::<String>()) {
        let assets = SerializedFile::parse(common::ui_assets(&script)).unwrap();
        let info = TypeInfo::for_object(&assets, common::NOTES_ID).unwrap();
        let object = assets.object(common::NOTES_ID).unwrap();
        let data = assets.object_data(object);

        let field = TypeTreeSerializer.deserialize(data, &info).unwrap();
        let text = TypeTreeSerializer.to_text(&field);
        let bytes = TypeTreeSerializer.from_text(&text, &info).unwrap();
        prop_assert_eq!(bytes.as_slice(), data);
    }

    /// Rewriting without replacers keeps every entry's name, flags and bytes.
    #[test]
    fn rewrite_without_changes_preserves_entries(entries in entries_strategy()) {
        let mut bundle = Bundle::open(Cursor::new(build(&entries))).unwrap();
        let mut out = Vec::new();
        let result = write_bundle(&mut bundle, &ReplacerSet::new(), &mut out).unwrap();
        prop_assert_eq!(result.entries_written, entries.len());
        prop_assert_eq!(result.total_size as usize, out.len());

        let mut rewritten = Bundle::open(Cursor::new(out)).unwrap();
        for (name, flags, data) in &entries {
            prop_assert_eq!(rewritten.entry(name).unwrap().flags, *flags);
            prop_assert_eq!(&rewritten.read_entry(name).unwrap(), data);
        }
    }

    /// Replaced entries take their new size; the others are untouched and
    /// offsets stay contiguous in directory order.
    #[test]
    fn rewrite_with_replacement_is_contiguous(
        entries in entries_strategy(),
        pick in any::<prop::sample::Index>(),
        replacement in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let target = entries[pick.index(entries.len())].0.clone();
        let mut replacers = ReplacerSet::new();
        replacers.insert(target.clone(), Replacer::FromBuffer(replacement.clone())).unwrap();

        let mut bundle = Bundle::open(Cursor::new(build(&entries))).unwrap();
        let mut out = Vec::new();
        let result = write_bundle(&mut bundle, &replacers, &mut out).unwrap();
        prop_assert_eq!(result.entries_replaced, 1);

        let mut rewritten = Bundle::open(Cursor::new(out)).unwrap();
        let mut offset = 0;
        for (i, entry) in rewritten.entries().iter().enumerate() {
            prop_assert_eq!(&entry.name, &entries[i].0);
            prop_assert_eq!(entry.offset, offset);
            offset += entry.size;
        }
        for (name, _, data) in &entries {
            let expected = if *name == target { &replacement } else { data };
            prop_assert_eq!(&rewritten.read_entry(name).unwrap(), expected);
        }
    }
}

#[test]
fn backup_probe_reports_exhaustion() {
    let err = next_backup_path_by(Path::new("level0"), |_| true).unwrap_err();
    assert!(matches!(err, Error::BackupExhausted { .. }));
    assert_eq!(
        backup_path(Path::new("level0"), BACKUP_SLOTS - 1),
        PathBuf::from("level0.bak9999")
    );
}
