//! Container path listings.
//!
//! Bundles list their addressable assets in the `m_Container` field of the
//! `AssetBundle` object; player data does the same in `ResourceManager`.
//! Each listing entry pairs a path with a pointer to the asset's object.

use std::collections::HashMap;

use super::LoadedFile;
use crate::assets::class_id::{ASSET_BUNDLE, RESOURCE_MANAGER};
use crate::typetree::{Field, ObjectSerializer, TypeInfo};

/// Maps `(lowercased file name, path id)` to a container path.
pub(crate) type ContainerMap = HashMap<(String, i64), String>;

/// Collects the listing of every file: its `AssetBundle` listing, or its
/// `ResourceManager` listing when the file has no bundle listing.
pub(crate) fn collect(files: &[LoadedFile], serializer: &dyn ObjectSerializer) -> ContainerMap {
    let mut map = ContainerMap::new();
    for file in files {
        let listed = collect_class(file, ASSET_BUNDLE, serializer, &mut map, |entry| {
            entry.child("second").and_then(|info| info.child("asset"))
        });
        if listed == 0 {
            collect_class(file, RESOURCE_MANAGER, serializer, &mut map, |entry| {
                entry.child("second")
            });
        }
    }
    map
}

fn collect_class(
    loaded: &LoadedFile,
    class_id: i32,
    serializer: &dyn ObjectSerializer,
    map: &mut ContainerMap,
    pointer: impl Fn(&Field) -> Option<&Field>,
) -> usize {
    let file = &loaded.file;
    let mut listed = 0;
    for object in file.objects.iter().filter(|o| o.class_id == class_id) {
        let Ok(info) = TypeInfo::for_object(file, object.path_id) else {
            continue;
        };
        let root = match serializer.deserialize(file.object_data(object), &info) {
            Ok(root) => root,
            Err(e) => {
                log::warn!(
                    "Cannot read container listing {} in {}: {}",
                    object.path_id,
                    loaded.name,
                    e
                );
                continue;
            }
        };
        let Some(entries) = root.child("m_Container").and_then(Field::elements) else {
            continue;
        };

        for entry in entries {
            let path = entry.child("first").and_then(Field::as_str);
            let target = pointer(entry).and_then(|p| {
                Some((
                    p.child("m_FileID")?.as_i64()?,
                    p.child("m_PathID")?.as_i64()?,
                ))
            });
            let (Some(path), Some((file_id, path_id))) = (path, target) else {
                continue;
            };
            let target_file = if file_id == 0 {
                Some(loaded.name.as_str())
            } else {
                i32::try_from(file_id)
                    .ok()
                    .and_then(|id| file.external_file_name(id))
            };
            if let Some(name) = target_file {
                listed += 1;
                map.entry((name.to_lowercase(), path_id))
                    .or_insert_with(|| path.to_string());
            }
        }
    }
    listed
}
