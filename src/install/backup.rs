//! Backup slot probing.

use std::path::{Path, PathBuf};

use crate::fs::side_path;
use crate::{Error, Result};

/// Number of backup slots per file, `.bak0000` through `.bak9999`.
pub const BACKUP_SLOTS: u32 = 10_000;

/// The first free backup path for `path`.
///
/// # Errors
///
/// Returns [`Error::BackupExhausted`] when every slot already exists.
pub fn next_backup_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    next_backup_path_by(path.as_ref(), |p| p.exists())
}

/// [`next_backup_path`] with a caller-supplied existence check.
pub fn next_backup_path_by(path: &Path, exists: impl Fn(&Path) -> bool) -> Result<PathBuf> {
    (0..BACKUP_SLOTS)
        .map(|slot| backup_path(path, slot))
        .find(|candidate| !exists(candidate))
        .ok_or_else(|| Error::BackupExhausted {
            path: path.to_path_buf(),
        })
}

/// The path of backup slot `slot`.
pub fn backup_path(path: &Path, slot: u32) -> PathBuf {
    side_path(path, &format!(".bak{:04}", slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_slot() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("level0");
        assert_eq!(next_backup_path(&target).unwrap(), dir.path().join("level0.bak0000"));
    }

    #[test]
    fn test_skips_taken_slots() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("level0");
        std::fs::write(backup_path(&target, 0), b"").unwrap();
        std::fs::write(backup_path(&target, 1), b"").unwrap();
        std::fs::write(backup_path(&target, 3), b"").unwrap();
        assert_eq!(next_backup_path(&target).unwrap(), backup_path(&target, 2));
    }

    #[test]
    fn test_exhausted() {
        let err = next_backup_path_by(Path::new("level0"), |_| true).unwrap_err();
        assert!(matches!(err, Error::BackupExhausted { .. }));
        let last_slot = backup_path(Path::new("level0"), 9999);
        let last = next_backup_path_by(Path::new("level0"), |p| p != last_slot.as_path());
        assert_eq!(last.unwrap(), Path::new("level0.bak9999"));
    }
}
