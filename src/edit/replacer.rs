//! The replacement byte source.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::read::Bundle;
use crate::{Error, Result};

/// Where a [`Replacer::FromRegion`] reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSource {
    /// The data being rewritten: a bundle's decompressed data stream, or an
    /// assets file's object data region.
    Original,
    /// A file on disk, opened only while the region is copied.
    File(PathBuf),
}

/// New content for one entry or object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacer {
    /// Keep the original bytes.
    CopyOriginal,
    /// Copy `length` bytes starting at `offset` of `source`.
    FromRegion {
        /// The byte source.
        source: RegionSource,
        /// Start of the region.
        offset: u64,
        /// Length of the region.
        length: u64,
    },
    /// Use these bytes.
    FromBuffer(Vec<u8>),
}

/// Access to the original bytes of the thing being rewritten.
pub trait OriginalData {
    /// Copies `len` bytes starting at `offset` into `out`.
    fn copy_original(&mut self, offset: u64, len: u64, out: &mut dyn Write) -> Result<u64>;
}

impl<R: Read + Seek> OriginalData for Bundle<R> {
    fn copy_original(&mut self, offset: u64, len: u64, out: &mut dyn Write) -> Result<u64> {
        self.copy_region(offset, len, out)
    }
}

impl Replacer {
    /// Replaces with the whole content of a file.
    ///
    /// Only the length is read now; the file is opened again when written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFile`] if the file does not exist.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let length = std::fs::metadata(path)?.len();
        Ok(Replacer::FromRegion {
            source: RegionSource::File(path.to_path_buf()),
            offset: 0,
            length,
        })
    }

    /// Number of bytes this replacer produces for an original of `original_len` bytes.
    pub fn output_len(&self, original_len: u64) -> u64 {
        match self {
            Replacer::CopyOriginal => original_len,
            Replacer::FromRegion { length, .. } => *length,
            Replacer::FromBuffer(bytes) => bytes.len() as u64,
        }
    }

    /// Returns the variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Replacer::CopyOriginal => "copy",
            Replacer::FromRegion {
                source: RegionSource::Original,
                ..
            } => "original region",
            Replacer::FromRegion {
                source: RegionSource::File(_),
                ..
            } => "file region",
            Replacer::FromBuffer(_) => "buffer",
        }
    }

    /// Writes the replacement bytes for an item whose original bytes are
    /// `original_offset..original_offset + original_len` of `original`.
    pub(crate) fn emit(
        &self,
        original: &mut dyn OriginalData,
        original_offset: u64,
        original_len: u64,
        out: &mut dyn Write,
    ) -> Result<u64> {
        match self {
            Replacer::CopyOriginal => original.copy_original(original_offset, original_len, out),
            Replacer::FromRegion {
                source: RegionSource::Original,
                offset,
                length,
            } => original.copy_original(*offset, *length, out),
            Replacer::FromRegion {
                source: RegionSource::File(path),
                offset,
                length,
            } => copy_file_region(path, *offset, *length, out),
            Replacer::FromBuffer(bytes) => {
                out.write_all(bytes)?;
                Ok(bytes.len() as u64)
            }
        }
    }
}

fn copy_file_region(path: &Path, offset: u64, length: u64, out: &mut dyn Write) -> Result<u64> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::MissingFile {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    file.seek(SeekFrom::Start(offset))?;
    let copied = io::copy(&mut file.take(length), out)?;
    if copied != length {
        return Err(Error::WriteFailure {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("region {}+{} ends after {} bytes", offset, length, copied),
            ),
        });
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slice(Vec<u8>);

    impl OriginalData for Slice {
        fn copy_original(&mut self, offset: u64, len: u64, out: &mut dyn Write) -> Result<u64> {
            out.write_all(&self.0[offset as usize..(offset + len) as usize])?;
            Ok(len)
        }
    }

    #[test]
    fn test_emit_each_variant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut original = Slice(b"abcdefgh".to_vec());
        let cases = [
            (Replacer::CopyOriginal, b"cde".to_vec()),
            (
                Replacer::FromRegion {
                    source: RegionSource::Original,
                    offset: 5,
                    length: 3,
                },
                b"fgh".to_vec(),
            ),
            (
                Replacer::FromRegion {
                    source: RegionSource::File(path.clone()),
                    offset: 2,
                    length: 4,
                },
                b"2345".to_vec(),
            ),
            (Replacer::FromBuffer(b"xyz!".to_vec()), b"xyz!".to_vec()),
        ];

        for (replacer, expected) in cases {
            let mut out = Vec::new();
            let n = replacer.emit(&mut original, 2, 3, &mut out).unwrap();
            assert_eq!(out, expected, "{}", replacer.kind());
            assert_eq!(n, replacer.output_len(3));
        }
    }

    #[test]
    fn test_short_file_region_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, b"abc").unwrap();

        let replacer = Replacer::FromRegion {
            source: RegionSource::File(path),
            offset: 1,
            length: 10,
        };
        let mut out = Vec::new();
        let err = replacer
            .emit(&mut Slice(Vec::new()), 0, 0, &mut out)
            .unwrap_err();
        assert!(matches!(err, Error::WriteFailure { .. }));
        assert!(err.is_io_error());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry");
        std::fs::write(&path, vec![1u8; 42]).unwrap();

        let replacer = Replacer::from_file(&path).unwrap();
        assert_eq!(replacer.output_len(0), 42);
        assert!(matches!(
            Replacer::from_file(dir.path().join("missing")),
            Err(Error::MissingFile { .. })
        ));
    }
}
