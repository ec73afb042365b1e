//! Single label views over a name's wire bytes.

use std::cmp::Ordering;
use std::fmt;

/// A borrowed label of a domain name (without its length byte).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Label<'a> {
    bytes: &'a [u8],
}

impl<'a> Label<'a> {
    /// Wraps raw label bytes.
    #[inline]
    pub const fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes of the label.
    #[inline]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the length of the label in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for the empty root label.
    #[inline]
    pub const fn is_root(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns true for the empty root label.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Case-insensitive comparison with another label.
    #[inline]
    pub fn eq_ignore_ascii_case(&self, other: &Label<'_>) -> bool {
        self.bytes.eq_ignore_ascii_case(other.bytes)
    }

    /// Canonical comparison per RFC 4034 section 6.1.
    pub fn cmp_canonical(&self, other: &Label<'_>) -> Ordering {
        let a = self.bytes.iter().map(u8::to_ascii_lowercase);
        let b = other.bytes.iter().map(u8::to_ascii_lowercase);
        a.cmp(b)
    }
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.bytes {
            match byte {
                b'.' | b'\\' | b'"' | b'(' | b')' | b';' | b'@' | b'$' => {
                    write!(f, "\\{}", byte as char)?;
                }
                c if c.is_ascii_graphic() => write!(f, "{}", c as char)?,
                c => write!(f, "\\{c:03}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label(\"{self}\")")
    }
}

/// Iterator over the labels of an uncompressed wire name, root included.
#[derive(Debug, Clone)]
pub struct LabelIter<'a> {
    wire: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> LabelIter<'a> {
    pub(super) const fn new(wire: &'a [u8]) -> Self {
        Self {
            wire,
            pos: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for LabelIter<'a> {
    type Item = Label<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let len = self.wire.get(self.pos).copied().unwrap_or(0) as usize;
        if len == 0 {
            self.done = true;
            return Some(Label::from_bytes(&[]));
        }
        let start = self.pos + 1;
        let end = (start + len).min(self.wire.len());
        self.pos = end;
        Some(Label::from_bytes(&self.wire[start..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_iter() {
        let wire = [3, b'w', b'w', b'w', 2, b'i', b'o', 0];
        let labels: Vec<_> = LabelIter::new(&wire).map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["www", "io", ""]);
    }

    #[test]
    fn test_label_display_escapes() {
        assert_eq!(Label::from_bytes(b"a.b").to_string(), "a\\.b");
        assert_eq!(Label::from_bytes(b"a b").to_string(), "a\\032b");
        assert_eq!(Label::from_bytes(&[0xFF]).to_string(), "\\255");
    }

    #[test]
    fn test_canonical_cmp() {
        let a = Label::from_bytes(b"ABC");
        let b = Label::from_bytes(b"abd");
        let c = Label::from_bytes(b"ab");
        assert_eq!(a.cmp_canonical(&b), Ordering::Less);
        assert_eq!(c.cmp_canonical(&a), Ordering::Less);
        assert!(a.eq_ignore_ascii_case(&Label::from_bytes(b"abc")));
    }
}
