//! Low-level binary reading and writing utilities.
//!
//! Bundles are always big-endian. Serialized files carry an endianness flag
//! in their header, so the slice cursor [`ByteReader`] and the buffer writer
//! [`ByteWriter`] take the byte order at construction.

use std::io::{self, Read};

use crate::{Error, Result};

/// Upper bound on C string lengths read from streams.
const MAX_CSTRING_LEN: usize = 4096;

/// Reads a single byte from a reader.
pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads a big-endian u16 from a reader.
pub fn read_u16_be<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

/// Reads a big-endian u32 from a reader.
pub fn read_u32_be<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Reads a big-endian i64 from a reader.
pub fn read_i64_be<R: Read>(r: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

/// Reads a NUL-terminated string from a reader.
///
/// Strings longer than an internal limit are rejected as invalid data.
pub fn read_cstring<R: Read>(r: &mut R) -> io::Result<String> {
    let mut bytes = Vec::new();
    loop {
        let b = read_u8(r)?;
        if b == 0 {
            break;
        }
        if bytes.len() == MAX_CSTRING_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "unterminated string",
            ));
        }
        bytes.push(b);
    }
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// A cursor over a byte slice with a fixed byte order.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
}

macro_rules! read_number {
    ($name:ident, $ty:ty) => {
        #[doc = concat!("Reads a `", stringify!($ty), "` in the reader's byte order.")]
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes = self.read_array()?;
            Ok(if self.big_endian {
                <$ty>::from_be_bytes(bytes)
            } else {
                <$ty>::from_le_bytes(bytes)
            })
        }
    };
}

impl<'a> ByteReader<'a> {
    /// Creates a cursor at the start of `data`.
    pub fn new(data: &'a [u8], big_endian: bool) -> Self {
        Self {
            data,
            pos: 0,
            big_endian,
        }
    }

    /// Current position from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to an absolute position.
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::Truncated {
                offset: pos as u64,
                needed: (pos - self.data.len()) as u64,
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Switches the byte order for subsequent reads.
    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.big_endian = big_endian;
    }

    /// Reads `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::Truncated {
                offset: self.pos as u64,
                needed: (len - self.remaining()) as u64,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads one signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a byte as a boolean.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_number!(read_u16, u16);
    read_number!(read_i16, i16);
    read_number!(read_u32, u32);
    read_number!(read_i32, i32);
    read_number!(read_u64, u64);
    read_number!(read_i64, i64);
    read_number!(read_f32, f32);
    read_number!(read_f64, f64);

    /// Reads a NUL-terminated string.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::Truncated {
                offset: self.pos as u64,
                needed: 1,
            })?;
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(s)
    }

    /// Advances to the next multiple of `alignment` from the slice start.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let target = self.pos.div_ceil(alignment) * alignment;
        self.set_position(target)
    }
}

/// A growable output buffer with a fixed byte order.
///
/// `base` is the absolute position of the buffer's first byte in the file
/// being produced; alignment is computed against it.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    base: usize,
    big_endian: bool,
}

macro_rules! write_number {
    ($name:ident, $ty:ty) => {
        #[doc = concat!("Writes a `", stringify!($ty), "` in the writer's byte order.")]
        pub fn $name(&mut self, value: $ty) {
            if self.big_endian {
                self.buf.extend_from_slice(&value.to_be_bytes());
            } else {
                self.buf.extend_from_slice(&value.to_le_bytes());
            }
        }
    };
}

impl ByteWriter {
    /// Creates an empty writer whose first byte lands at file offset 0.
    pub fn new(big_endian: bool) -> Self {
        Self::with_base(big_endian, 0)
    }

    /// Creates an empty writer whose first byte lands at file offset `base`.
    pub fn with_base(big_endian: bool, base: usize) -> Self {
        Self {
            buf: Vec::new(),
            base,
            big_endian,
        }
    }

    /// Switches the byte order for subsequent writes.
    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.big_endian = big_endian;
    }

    /// Absolute position of the next byte.
    pub fn position(&self) -> usize {
        self.base + self.buf.len()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Appends one signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    /// Appends a boolean as one byte.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    write_number!(write_u16, u16);
    write_number!(write_i16, i16);
    write_number!(write_u32, u32);
    write_number!(write_i32, i32);
    write_number!(write_u64, u64);
    write_number!(write_i64, i64);
    write_number!(write_f32, f32);
    write_number!(write_f64, f64);

    /// Appends a string followed by a NUL byte.
    pub fn write_cstring(&mut self, value: &str) {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }

    /// Pads with zeros up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        let pos = self.position();
        let target = pos.div_ceil(alignment) * alignment;
        self.buf.resize(self.buf.len() + (target - pos), 0);
    }

    /// Returns the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stream_cstring() {
        let mut cursor = Cursor::new(b"UnityFS\0rest".to_vec());
        assert_eq!(read_cstring(&mut cursor).unwrap(), "UnityFS");
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn test_stream_cstring_unterminated() {
        let mut cursor = Cursor::new(b"abc".to_vec());
        assert!(read_cstring(&mut cursor).is_err());
    }

    #[test]
    fn test_byte_order() {
        let data = [0x00, 0x00, 0x00, 0x16];
        assert_eq!(ByteReader::new(&data, true).read_u32().unwrap(), 0x16);
        assert_eq!(
            ByteReader::new(&data, false).read_u32().unwrap(),
            0x1600_0000
        );
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let data = [1u8, 2];
        let mut reader = ByteReader::new(&data, false);
        reader.read_u8().unwrap();
        match reader.read_u32() {
            Err(Error::Truncated { offset, needed }) => {
                assert_eq!(offset, 1);
                assert_eq!(needed, 3);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_writer_align_uses_base() {
        let mut w = ByteWriter::with_base(false, 3);
        w.write_u8(7);
        w.align(4);
        assert_eq!(w.position(), 4);
        assert_eq!(w.into_inner(), vec![7]);

        let mut w = ByteWriter::new(true);
        w.write_u16(0x0102);
        w.write_cstring("ab");
        w.align(4);
        assert_eq!(w.into_inner(), vec![1, 2, b'a', b'b', 0, 0, 0, 0]);
    }

    #[test]
    fn test_reader_align() {
        let data = [0u8; 8];
        let mut r = ByteReader::new(&data, false);
        r.read_u8().unwrap();
        r.align(4).unwrap();
        assert_eq!(r.position(), 4);
        r.align(4).unwrap();
        assert_eq!(r.position(), 4);
    }
}
