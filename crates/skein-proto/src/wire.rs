//! Wire format cursor and shared field helpers.
//!
//! Record data is always decoded against the whole message so that embedded
//! names can follow compression pointers; [`WireReader`] therefore carries the
//! full buffer and a position rather than a sub-slice.

use crate::error::{Error, Result};
use bytes::{BufMut, BytesMut};

/// A bounds-checked cursor over a complete DNS message.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Creates a reader positioned at `offset`.
    #[inline]
    pub const fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, pos: offset }
    }

    /// Returns the whole message.
    #[inline]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the current position.
    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Moves the cursor to `pos`.
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Skips `n` bytes.
    #[inline]
    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    #[inline]
    fn ensure(&self, n: usize) -> Result<()> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Error::unexpected_eof(self.pos.saturating_add(n))),
        }
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    /// Reads a big-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let value = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(value)
    }

    /// Reads a big-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let b = &self.data[self.pos..self.pos + 4];
        self.pos += 4;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads `len` raw bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a `<character-string>`: a length byte followed by that many bytes.
    pub fn read_character_string(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }
}

/// Bounds a record's RDATA inside a message.
///
/// Returns the exclusive end offset, failing when `offset + rdlength` runs
/// past the buffer.
#[inline]
pub fn rdata_end(message: &[u8], offset: usize, rdlength: u16) -> Result<usize> {
    let end = offset + rdlength as usize;
    if end > message.len() {
        return Err(Error::unexpected_eof(end));
    }
    Ok(end)
}

/// Fails unless a fixed-shape record consumed exactly its declared length.
#[inline]
pub fn expect_consumed(rtype: &str, start: usize, end: usize, rdlength: u16) -> Result<()> {
    let consumed = end - start;
    if consumed != rdlength as usize {
        return Err(Error::rdata_length(rtype, rdlength as usize, consumed));
    }
    Ok(())
}

/// Writes a `<character-string>`.
///
/// Record constructors reject values longer than 255 bytes, so `data` always
/// fits the length byte.
pub fn write_character_string(buf: &mut BytesMut, data: &[u8]) {
    debug_assert!(data.len() <= 255, "character-string exceeds 255 bytes");
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u8(data.len() as u8);
    buf.put_slice(data);
}

/// Renders bytes as a quoted master-file `<character-string>`.
///
/// Quotes and backslashes are escaped, printable ASCII passes through and
/// everything else is written as `\DDD`.
pub fn fmt_character_string(f: &mut std::fmt::Formatter<'_>, data: &[u8]) -> std::fmt::Result {
    f.write_str("\"")?;
    for &byte in data {
        match byte {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            c if c.is_ascii_graphic() || c == b' ' => write!(f, "{}", c as char)?,
            c => write!(f, "\\{c:03}")?,
        }
    }
    f.write_str("\"")
}

/// Parses a master-file `<character-string>` token.
///
/// Surrounding quotes are optional. `\X` yields `X` and `\DDD` yields the
/// decimal byte value.
pub fn parse_character_string(token: &str) -> Result<Vec<u8>> {
    let bytes = token.as_bytes();
    let inner = if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        &bytes[1..bytes.len() - 1]
    } else {
        bytes
    };

    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] != b'\\' {
            out.push(inner[i]);
            i += 1;
            continue;
        }
        if i + 1 >= inner.len() {
            return Err(Error::InvalidEscape { position: i });
        }
        if inner[i + 1].is_ascii_digit() {
            if i + 4 > inner.len() {
                return Err(Error::InvalidEscape { position: i });
            }
            let digits = &inner[i + 1..i + 4];
            if !digits.iter().all(u8::is_ascii_digit) {
                return Err(Error::InvalidEscape { position: i });
            }
            let value = digits
                .iter()
                .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
            let value = u8::try_from(value).map_err(|_| Error::InvalidEscape { position: i })?;
            out.push(value);
            i += 4;
        } else {
            out.push(inner[i + 1]);
            i += 2;
        }
    }

    if out.len() > 255 {
        return Err(Error::invalid_data(0, "character-string exceeds 255 bytes"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_reader() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A];
        let mut reader = WireReader::new(&data);

        assert_eq!(reader.read_u8().unwrap(), 0x12);
        assert_eq!(reader.read_u16().unwrap(), 0x3456);
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.read_bytes(2).unwrap(), &[0x78, 0x9A]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_wire_reader_bounds() {
        let data = [0x12, 0x34];
        let mut reader = WireReader::new(&data);
        assert!(reader.read_u32().is_err());

        let mut reader = WireReader::at(&data, 1);
        assert!(reader.read_u16().is_err());
        assert_eq!(reader.read_u8().unwrap(), 0x34);
    }

    #[test]
    fn test_character_string_wire() {
        let data = [3, b'a', b'b', b'c', 5, b'x'];
        let mut reader = WireReader::new(&data);
        assert_eq!(reader.read_character_string().unwrap(), b"abc");
        assert!(reader.read_character_string().is_err());

        let mut buf = BytesMut::new();
        write_character_string(&mut buf, b"hi");
        assert_eq!(&buf[..], &[2, b'h', b'i']);
    }

    #[test]
    fn test_rdata_bounds() {
        let msg = [0u8; 10];
        assert_eq!(rdata_end(&msg, 4, 6).unwrap(), 10);
        assert!(rdata_end(&msg, 4, 7).is_err());
        assert!(expect_consumed("A", 0, 4, 4).is_ok());
        assert!(expect_consumed("A", 0, 4, 5).is_err());
    }

    #[test]
    fn test_parse_character_string() {
        assert_eq!(parse_character_string("\"hello world\"").unwrap(), b"hello world");
        assert_eq!(parse_character_string("plain").unwrap(), b"plain");
        assert_eq!(parse_character_string("\"a\\\"b\"").unwrap(), b"a\"b");
        assert_eq!(parse_character_string("\\065\\066").unwrap(), b"AB");
        assert!(parse_character_string("bad\\").is_err());
        assert!(parse_character_string("\\999").is_err());
    }
}
