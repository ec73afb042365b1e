//! Name decoding from wire format and from master-file text.
//!
//! Wire decoding follows compression pointers (RFC 1035 section 4.1.4) but
//! only backwards, so every pointer chain strictly decreases and terminates.

use super::Name;
use crate::error::{Error, Result};
use crate::wire::WireReader;
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use smallvec::SmallVec;

/// Maximum number of compression pointer jumps to prevent infinite loops.
pub const MAX_COMPRESSION_JUMPS: usize = 128;

/// Reads domain names out of a complete DNS message.
#[derive(Debug, Clone, Copy)]
pub struct NameParser<'a> {
    message: &'a [u8],
}

impl<'a> NameParser<'a> {
    /// Creates a parser over the whole message buffer.
    #[inline]
    pub const fn new(message: &'a [u8]) -> Self {
        Self { message }
    }

    /// Parses a name starting at `offset`.
    ///
    /// Returns the name and the number of bytes it occupies at `offset`
    /// (a followed pointer counts as its two bytes only).
    pub fn parse_name(&self, offset: usize) -> Result<(Name, usize)> {
        let mut wire = SmallVec::<[u8; 64]>::new();
        let mut label_count = 0u8;
        let mut consumed = None;
        let mut pos = offset;
        let mut jumps = 0;

        loop {
            let len_byte = *self
                .message
                .get(pos)
                .ok_or(Error::UnexpectedEof { offset: pos })?;

            match len_byte & 0xC0 {
                0xC0 => {
                    let low = *self
                        .message
                        .get(pos + 1)
                        .ok_or(Error::UnexpectedEof { offset: pos + 1 })?;
                    let target = (usize::from(len_byte & 0x3F) << 8) | usize::from(low);

                    if target >= pos {
                        return Err(Error::InvalidCompressionPointer {
                            offset: pos,
                            target,
                        });
                    }

                    jumps += 1;
                    if jumps > MAX_COMPRESSION_JUMPS {
                        return Err(Error::TooManyCompressionJumps {
                            max_jumps: MAX_COMPRESSION_JUMPS,
                        });
                    }

                    consumed.get_or_insert_with(|| pos - offset + 2);
                    pos = target;
                }
                0x00 => {
                    let len = len_byte as usize;
                    if len == 0 {
                        wire.push(0);
                        label_count += 1;
                        consumed.get_or_insert_with(|| pos - offset + 1);
                        break;
                    }

                    let end = pos + 1 + len;
                    if end > self.message.len() {
                        return Err(Error::UnexpectedEof { offset: end });
                    }
                    // Leave room for the terminating root byte.
                    if wire.len() + 1 + len + 1 > MAX_NAME_LENGTH {
                        return Err(Error::NameTooLong {
                            length: wire.len() + 1 + len + 1,
                        });
                    }

                    wire.extend_from_slice(&self.message[pos..end]);
                    label_count += 1;
                    pos = end;
                }
                _ => {
                    return Err(Error::invalid_data(
                        pos,
                        format!("unsupported label type 0x{len_byte:02X}"),
                    ));
                }
            }
        }

        let consumed = consumed.unwrap_or(1);
        Ok((Name::from_parts(wire, label_count), consumed))
    }
}

impl WireReader<'_> {
    /// Reads a possibly compressed name at the cursor and advances past it.
    pub fn read_name(&mut self) -> Result<Name> {
        let (name, consumed) = NameParser::new(self.data()).parse_name(self.position())?;
        self.advance(consumed)?;
        Ok(name)
    }
}

/// Result of splitting presentation text into wire labels.
pub(super) struct TextLabels {
    pub wire: SmallVec<[u8; 64]>,
    pub label_count: u8,
    pub absolute: bool,
}

/// Converts presentation text such as `www.exa\.mple.com.` into wire labels.
///
/// The returned wire has no root byte; `absolute` reports whether the text
/// ended in an unescaped dot.
pub(super) fn parse_text_labels(s: &str) -> Result<TextLabels> {
    let bytes = s.as_bytes();
    let mut wire = SmallVec::<[u8; 64]>::new();
    let mut label = SmallVec::<[u8; 63]>::new();
    let mut label_count = 0u8;
    let mut absolute = false;
    let mut i = 0;

    if s == "." {
        return Ok(TextLabels {
            wire,
            label_count: 0,
            absolute: true,
        });
    }

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'.' => {
                if label.is_empty() {
                    return Err(Error::EmptyLabel { position: i });
                }
                push_label(&mut wire, &label)?;
                label.clear();
                label_count += 1;
                if i + 1 == bytes.len() {
                    absolute = true;
                }
                i += 1;
            }
            b'\\' => {
                let next = *bytes.get(i + 1).ok_or(Error::InvalidEscape { position: i })?;
                if next.is_ascii_digit() {
                    let digits = bytes
                        .get(i + 1..i + 4)
                        .filter(|d| d.iter().all(u8::is_ascii_digit))
                        .ok_or(Error::InvalidEscape { position: i })?;
                    let value = digits
                        .iter()
                        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
                    let value =
                        u8::try_from(value).map_err(|_| Error::InvalidEscape { position: i })?;
                    push_byte(&mut label, value)?;
                    i += 4;
                } else {
                    push_byte(&mut label, next)?;
                    i += 2;
                }
            }
            _ => {
                push_byte(&mut label, b)?;
                i += 1;
            }
        }
    }

    if !label.is_empty() {
        push_label(&mut wire, &label)?;
        label_count += 1;
    }

    Ok(TextLabels {
        wire,
        label_count,
        absolute,
    })
}

fn push_byte(label: &mut SmallVec<[u8; 63]>, b: u8) -> Result<()> {
    if label.len() == MAX_LABEL_LENGTH {
        return Err(Error::LabelTooLong {
            length: MAX_LABEL_LENGTH + 1,
        });
    }
    label.push(b);
    Ok(())
}

fn push_label(wire: &mut SmallVec<[u8; 64]>, label: &[u8]) -> Result<()> {
    let length = wire.len() + 1 + label.len() + 1;
    if length > MAX_NAME_LENGTH {
        return Err(Error::NameTooLong { length });
    }
    #[allow(clippy::cast_possible_truncation)]
    wire.push(label.len() as u8);
    wire.extend_from_slice(label);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uncompressed() {
        let wire = [3, b'w', b'w', b'w', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0];
        let (name, consumed) = NameParser::new(&wire).parse_name(0).unwrap();
        assert_eq!(name.to_string(), "www.example.");
        assert_eq!(consumed, wire.len());
    }

    #[test]
    fn test_parse_backward_pointer() {
        // "example." at 0, then "www" + pointer to 0 at offset 9
        let msg = [
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0, 3, b'w', b'w', b'w', 0xC0, 0x00,
        ];
        let (name, consumed) = NameParser::new(&msg).parse_name(9).unwrap();
        assert_eq!(name.to_string(), "www.example.");
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_parse_pointer_chain() {
        // "example." at 0, "www" + pointer to 0 at 9, then a bare pointer to 9
        // at 15 and "mail" + pointer to 15 at 17.
        let msg = [
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0, 3, b'w', b'w', b'w', 0xC0, 0x00, 0xC0,
            0x09, 4, b'm', b'a', b'i', b'l', 0xC0, 0x0F,
        ];
        let (name, consumed) = NameParser::new(&msg).parse_name(15).unwrap();
        assert_eq!(name.to_string(), "www.example.");
        assert_eq!(consumed, 2);

        let (name, consumed) = NameParser::new(&msg).parse_name(17).unwrap();
        assert_eq!(name.to_string(), "mail.www.example.");
        assert_eq!(consumed, 7);
    }

    #[test]
    fn test_reject_forward_and_self_pointer() {
        let msg = [0xC0, 0x00];
        assert!(matches!(
            NameParser::new(&msg).parse_name(0),
            Err(Error::InvalidCompressionPointer { .. })
        ));

        let msg = [0xC0, 0x02, 0x00];
        assert!(matches!(
            NameParser::new(&msg).parse_name(0),
            Err(Error::InvalidCompressionPointer { .. })
        ));
    }

    #[test]
    fn test_truncated_label() {
        let msg = [5, b'a', b'b'];
        assert!(NameParser::new(&msg).parse_name(0).unwrap_err().is_malformed());
    }

    #[test]
    fn test_reserved_label_type() {
        let msg = [0x40, 0x00];
        assert!(NameParser::new(&msg).parse_name(0).is_err());
    }

    #[test]
    fn test_reader_read_name() {
        let msg = [1, b'a', 0, 0xAB];
        let mut reader = WireReader::new(&msg);
        let name = reader.read_name().unwrap();
        assert_eq!(name.to_string(), "a.");
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
    }

    #[test]
    fn test_text_labels() {
        let parsed = parse_text_labels("a\\.b.c").unwrap();
        assert_eq!(parsed.label_count, 2);
        assert!(!parsed.absolute);
        assert_eq!(&parsed.wire[..], &[3, b'a', b'.', b'b', 1, b'c']);

        assert!(parse_text_labels("a..b").is_err());
        assert!(parse_text_labels("a\\2").is_err());
        assert!(parse_text_labels("\\256").is_err());
    }
}
