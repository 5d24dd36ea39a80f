//! Names of common engine classes.

/// `GameObject`.
pub const GAME_OBJECT: i32 = 1;
/// `MonoBehaviour`.
pub const MONO_BEHAVIOUR: i32 = 114;
/// `MonoScript`.
pub const MONO_SCRIPT: i32 = 115;
/// `AssetBundle`.
pub const ASSET_BUNDLE: i32 = 142;
/// `ResourceManager`.
pub const RESOURCE_MANAGER: i32 = 147;

const CLASS_NAMES: &[(i32, &str)] = &[
    (1, "GameObject"),
    (4, "Transform"),
    (21, "Material"),
    (28, "Texture2D"),
    (43, "Mesh"),
    (48, "Shader"),
    (49, "TextAsset"),
    (74, "AnimationClip"),
    (83, "AudioClip"),
    (114, "MonoBehaviour"),
    (115, "MonoScript"),
    (128, "Font"),
    (142, "AssetBundle"),
    (147, "ResourceManager"),
    (150, "PreloadData"),
    (213, "Sprite"),
];

/// Returns the engine name of a class id, if known.
pub fn class_name(class_id: i32) -> Option<&'static str> {
    CLASS_NAMES
        .iter()
        .find(|(id, _)| *id == class_id)
        .map(|(_, name)| *name)
}
