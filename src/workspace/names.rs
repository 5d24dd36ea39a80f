//! Class and display names of objects.

use super::LoadedFile;
use crate::assets::ObjectInfo;
use crate::assets::class_id::{self, MONO_BEHAVIOUR};
use crate::typetree::{Field, ObjectSerializer, TypeInfo};

/// Longest display name kept, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Class name from the type tree root, then from the built-in table.
pub(crate) fn class_name(loaded: &LoadedFile, object: &ObjectInfo) -> String {
    loaded
        .file
        .type_tree_of(object)
        .and_then(|tree| tree.root())
        .map(|root| root.type_name.clone())
        .or_else(|| class_id::class_name(object.class_id).map(str::to_string))
        .unwrap_or_else(|| format!("Class{}", object.class_id))
}

/// The object's `m_Name`, the script class name for unnamed
/// `MonoBehaviour`s, or else the class name; truncated to [`MAX_NAME_LEN`].
pub(crate) fn display_name(
    files: &[LoadedFile],
    file_index: usize,
    object: &ObjectInfo,
    class: &str,
    serializer: &dyn ObjectSerializer,
) -> String {
    let loaded = &files[file_index];
    let field = decode(loaded, object, serializer);

    let named = field
        .as_ref()
        .and_then(|f| f.child("m_Name"))
        .and_then(Field::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    let scripted = || {
        if object.class_id != MONO_BEHAVIOUR {
            return None;
        }
        let script = field.as_ref()?.child("m_Script")?;
        script_class_name(files, file_index, script, serializer)
    };

    let name = named
        .or_else(scripted)
        .unwrap_or_else(|| class.to_string());
    truncate(&name)
}

fn script_class_name(
    files: &[LoadedFile],
    file_index: usize,
    pptr: &Field,
    serializer: &dyn ObjectSerializer,
) -> Option<String> {
    let file_id = i32::try_from(pptr.child("m_FileID")?.as_i64()?).ok()?;
    let path_id = pptr.child("m_PathID")?.as_i64()?;
    let target = if file_id == 0 {
        file_index
    } else {
        let name = files[file_index].file.external_file_name(file_id)?;
        files
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))?
    };
    let loaded = &files[target];
    let object = loaded.file.object(path_id)?;
    let script = decode(loaded, object, serializer)?;
    script
        .child("m_ClassName")
        .and_then(Field::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn decode(loaded: &LoadedFile, object: &ObjectInfo, serializer: &dyn ObjectSerializer) -> Option<Field> {
    let info = TypeInfo::for_object(&loaded.file, object.path_id).ok()?;
    match serializer.deserialize(loaded.file.object_data(object), &info) {
        Ok(field) => Some(field),
        Err(e) => {
            log::debug!(
                "Object {} in {} does not deserialize: {}",
                object.path_id,
                loaded.name,
                e
            );
            None
        }
    }
}

fn truncate(name: &str) -> String {
    name.chars().take(MAX_NAME_LEN).collect()
}
