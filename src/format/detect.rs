//! File kind detection.
//!
//! Batch commands walk whole directories, so every candidate is classified by
//! its leading bytes before anything tries to parse it.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::SIGNATURE;
use crate::{Error, Result};

/// Bytes inspected to classify a file.
const PROBE_LEN: usize = 48;

/// Oldest serialized file version considered plausible.
const MIN_ASSETS_VERSION: u32 = 9;

/// Newest serialized file version considered plausible.
const MAX_ASSETS_VERSION: u32 = 64;

/// What kind of Unity file a path holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// A UnityFS asset bundle.
    Bundle,
    /// A bare serialized (assets) file.
    Assets,
    /// Anything else.
    Unknown,
}

impl FileKind {
    /// Returns a human-readable name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            FileKind::Bundle => "bundle",
            FileKind::Assets => "assets",
            FileKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies the stream by its leading bytes.
///
/// The stream position is restored to the start afterwards.
pub fn detect_file_kind<R: Read + Seek>(reader: &mut R) -> Result<FileKind> {
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut probe = Vec::with_capacity(PROBE_LEN);
    reader.by_ref().take(PROBE_LEN as u64).read_to_end(&mut probe)?;
    reader.seek(SeekFrom::Start(0))?;

    Ok(classify(&probe, len))
}

/// Classifies the file at `path`.
///
/// # Errors
///
/// Returns [`Error::MissingFile`] if the path does not exist.
pub fn detect_path(path: impl AsRef<Path>) -> Result<FileKind> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let mut file = File::open(path)?;
    detect_file_kind(&mut file)
}

fn classify(probe: &[u8], file_len: u64) -> FileKind {
    if probe.len() > SIGNATURE.len()
        && probe.starts_with(SIGNATURE.as_bytes())
        && probe[SIGNATURE.len()] == 0
    {
        return FileKind::Bundle;
    }
    if looks_like_assets(probe, file_len) {
        return FileKind::Assets;
    }
    FileKind::Unknown
}

fn be_u32(probe: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&probe[at..at + 4]);
    u32::from_be_bytes(buf)
}

fn be_u64(probe: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&probe[at..at + 8]);
    u64::from_be_bytes(buf)
}

fn looks_like_assets(probe: &[u8], file_len: u64) -> bool {
    if probe.len() < 20 {
        return false;
    }
    let version = be_u32(probe, 8);
    if !(MIN_ASSETS_VERSION..=MAX_ASSETS_VERSION).contains(&version) {
        return false;
    }
    if version >= 22 {
        if probe.len() < PROBE_LEN {
            return false;
        }
        let file_size = be_u64(probe, 24);
        let data_offset = be_u64(probe, 32);
        file_size == file_len && data_offset <= file_size
    } else {
        let file_size = u64::from(be_u32(probe, 4));
        let data_offset = u64::from(be_u32(probe, 12));
        file_size == file_len && data_offset <= file_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_detect_bundle() {
        let mut data = b"UnityFS\0".to_vec();
        data.extend_from_slice(&[0u8; 40]);
        let kind = detect_file_kind(&mut Cursor::new(data)).unwrap();
        assert_eq!(kind, FileKind::Bundle);
    }

    #[test]
    fn test_detect_assets_v22() {
        let mut data = vec![0u8; 64];
        data[8..12].copy_from_slice(&22u32.to_be_bytes());
        data[24..32].copy_from_slice(&64u64.to_be_bytes());
        data[32..40].copy_from_slice(&48u64.to_be_bytes());
        assert_eq!(
            detect_file_kind(&mut Cursor::new(data)).unwrap(),
            FileKind::Assets
        );
    }

    #[test]
    fn test_detect_assets_legacy_header() {
        let mut data = vec![0u8; 40];
        data[4..8].copy_from_slice(&40u32.to_be_bytes());
        data[8..12].copy_from_slice(&17u32.to_be_bytes());
        data[12..16].copy_from_slice(&32u32.to_be_bytes());
        assert_eq!(
            detect_file_kind(&mut Cursor::new(data)).unwrap(),
            FileKind::Assets
        );
    }

    #[test]
    fn test_detect_unknown() {
        let data = b"just some text that is not unity".to_vec();
        assert_eq!(
            detect_file_kind(&mut Cursor::new(data)).unwrap(),
            FileKind::Unknown
        );
        assert_eq!(
            detect_file_kind(&mut Cursor::new(Vec::new())).unwrap(),
            FileKind::Unknown
        );
    }

    #[test]
    fn test_detect_restores_position() {
        let mut cursor = Cursor::new(b"UnityFS\0\0\0\0\x07".to_vec());
        detect_file_kind(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_detect_missing_path() {
        let err = detect_path("/definitely/not/here.bundle").unwrap_err();
        assert!(matches!(err, Error::MissingFile { .. }));
    }
}
