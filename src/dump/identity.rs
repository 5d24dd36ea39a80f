//! Object identity carried in dump file names.
//!
//! A dump of object `path_id` in the payload file `<stem>` is written as
//! `<stem>-<token>-<pathId>.<ext>`, where the token is the object's display
//! name with every `-` and path-hostile character replaced by `_`. The token
//! never contains `-`, so the identity parses unambiguously from the right
//! even when the path id is negative or the stem itself contains dashes.

use std::sync::LazyLock;

use regex::Regex;

use super::DumpFormat;

/// Longest name token kept, in characters.
pub const MAX_TOKEN_LEN: usize = 100;

static IDENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^-]+)-(?P<id>-?\d+)\.(?P<ext>txt|json)$")
        .unwrap_or_else(|e| unreachable!("identity pattern is valid: {}", e))
});

/// The identity of one dump file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DumpIdentity {
    /// Name of the payload file the object lives in.
    pub stem: String,
    /// Sanitized display name.
    pub token: String,
    /// Object path id.
    pub path_id: i64,
    /// Dump format, from the extension.
    pub format: DumpFormat,
}

impl DumpIdentity {
    /// Creates an identity, sanitizing `name` into a token.
    pub fn new(stem: impl Into<String>, name: &str, path_id: i64, format: DumpFormat) -> Self {
        Self {
            stem: stem.into(),
            token: sanitize_token(name),
            path_id,
            format,
        }
    }

    /// The dump file name, `<stem>-<token>-<pathId>.<ext>`.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}.{}",
            self.stem,
            self.token,
            self.path_id,
            self.format.extension()
        )
    }

    /// Parses a dump file name belonging to `stem`.
    ///
    /// Returns `None` unless `file_name` is `stem`, a `-` and a valid
    /// `<token>-<pathId>.<ext>` tail. A path id that does not fit in `i64`
    /// does not parse.
    pub fn parse(stem: &str, file_name: &str) -> Option<Self> {
        let tail = file_name.strip_prefix(stem)?.strip_prefix('-')?;
        let caps = IDENTITY.captures(tail)?;
        let path_id = caps["id"].parse::<i64>().ok()?;
        let format = DumpFormat::from_extension(&caps["ext"])?;
        Some(Self {
            stem: stem.to_string(),
            token: caps["name"].to_string(),
            path_id,
            format,
        })
    }
}

/// Turns a display name into a file-name token.
///
/// `-`, path separators, characters Windows rejects in file names and
/// control characters become `_`; the result is cut to [`MAX_TOKEN_LEN`]
/// characters and is never empty.
pub fn sanitize_token(name: &str) -> String {
    let token: String = name
        .chars()
        .map(|c| match c {
            '-' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_TOKEN_LEN)
        .collect();
    if token.is_empty() { "_".to_string() } else { token }
}

/// Makes a bundle entry name usable as part of a file name.
pub fn sanitize_entry_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}
