//! DNS domain names.
//!
//! A [`Name`] always holds its uncompressed wire form, terminated by the
//! root label. Comparison and hashing are ASCII case-insensitive per
//! RFC 1035, and ordering is the canonical ordering of RFC 4034.
//!
//! # Example
//!
//! ```rust
//! use skein_proto::name::Name;
//! use std::str::FromStr;
//!
//! let name = Name::from_str("www.example.com.").unwrap();
//! assert_eq!(name.label_count(), 4); // www, example, com, root
//! assert_eq!(Name::from_str("WWW.EXAMPLE.COM").unwrap(), name);
//! ```

mod compress;
mod label;
mod parse;

pub use compress::CompressionTable;
pub use label::{Label, LabelIter};
pub use parse::{NameParser, MAX_COMPRESSION_JUMPS};

use crate::error::{Error, Result};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A fully-qualified DNS domain name.
#[derive(Clone)]
pub struct Name {
    /// Uncompressed wire bytes, always ending with the zero root label.
    wire: SmallVec<[u8; 64]>,
    /// Number of labels, root included.
    label_count: u8,
}

impl Name {
    /// Returns the root name `.`.
    #[inline]
    pub fn root() -> Self {
        Self {
            wire: SmallVec::from_slice(&[0]),
            label_count: 1,
        }
    }

    /// Assembles a name from already validated wire bytes.
    pub(crate) fn from_parts(wire: SmallVec<[u8; 64]>, label_count: u8) -> Self {
        Self { wire, label_count }
    }

    /// Creates a name from uncompressed wire bytes.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        let (name, consumed) = NameParser::new(bytes).parse_name(0)?;
        if consumed != bytes.len() || name.wire.len() != bytes.len() {
            return Err(Error::invalid_data(consumed, "trailing bytes after name"));
        }
        Ok(name)
    }

    /// Parses a master-file name token relative to `origin`.
    ///
    /// `@` is the origin itself; a token without a trailing dot has the
    /// origin appended.
    pub fn parse_relative(token: &str, origin: &Name) -> Result<Self> {
        if token == "@" {
            return Ok(origin.clone());
        }
        let parsed = parse::parse_text_labels(token)?;
        if parsed.absolute || token.is_empty() {
            return Ok(Self::finish(parsed.wire, parsed.label_count));
        }

        let mut wire = parsed.wire;
        let length = wire.len() + origin.wire.len();
        if length > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length });
        }
        wire.extend_from_slice(&origin.wire);
        Ok(Self {
            wire,
            label_count: parsed.label_count + origin.label_count,
        })
    }

    fn finish(mut wire: SmallVec<[u8; 64]>, label_count: u8) -> Self {
        wire.push(0);
        Self {
            wire,
            label_count: label_count + 1,
        }
    }

    /// Returns the uncompressed wire form, root byte included.
    #[inline]
    pub fn as_wire(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the wire length, root byte included.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire.len()
    }

    /// Returns the number of labels (including root).
    #[inline]
    pub const fn label_count(&self) -> usize {
        self.label_count as usize
    }

    /// Returns true if this is the root name.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.wire.len() == 1
    }

    /// Returns an iterator over the labels, ending with the root label.
    #[inline]
    pub fn labels(&self) -> LabelIter<'_> {
        LabelIter::new(&self.wire)
    }

    /// Returns the parent name, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let skip = 1 + self.wire[0] as usize;
        Some(Self {
            wire: SmallVec::from_slice(&self.wire[skip..]),
            label_count: self.label_count - 1,
        })
    }

    /// Returns a new name with `label` prepended.
    pub fn prepend_label(&self, label: &[u8]) -> Result<Self> {
        if label.is_empty() {
            return Err(Error::EmptyLabel { position: 0 });
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(Error::LabelTooLong {
                length: label.len(),
            });
        }
        let length = 1 + label.len() + self.wire.len();
        if length > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length });
        }

        let mut wire = SmallVec::with_capacity(length);
        #[allow(clippy::cast_possible_truncation)]
        wire.push(label.len() as u8);
        wire.extend_from_slice(label);
        wire.extend_from_slice(&self.wire);
        Ok(Self {
            wire,
            label_count: self.label_count + 1,
        })
    }

    /// Returns true if this name equals or lies beneath `other`.
    pub fn is_subdomain_of(&self, other: &Name) -> bool {
        let Some(offset) = self.wire.len().checked_sub(other.wire.len()) else {
            return false;
        };
        // The suffix must start on a label boundary.
        let mut pos = 0;
        while pos < offset {
            pos += 1 + self.wire[pos] as usize;
        }
        pos == offset && self.wire[offset..].eq_ignore_ascii_case(&other.wire)
    }

    /// Returns a lowercased copy of the name.
    #[must_use]
    pub fn lowercased(&self) -> Self {
        let mut copy = self.clone();
        copy.wire.make_ascii_lowercase();
        copy
    }

    /// Writes the name into `buf`.
    ///
    /// With a compression table, the longest suffix already present in the
    /// message is replaced by a pointer and every new suffix is recorded at
    /// its offset. Canonical output is lowercased and never compressed.
    pub fn encode(
        &self,
        buf: &mut BytesMut,
        compression: Option<&mut CompressionTable>,
        canonical: bool,
    ) {
        let mut table = if canonical { None } else { compression };
        let mut pos = 0;

        while self.wire[pos] != 0 {
            let suffix = &self.wire[pos..];
            if let Some(table) = table.as_deref_mut() {
                if let Some(target) = table.lookup(suffix) {
                    buf.put_u16(0xC000 | target);
                    return;
                }
                table.insert(suffix, buf.len());
            }

            let end = pos + 1 + self.wire[pos] as usize;
            if canonical {
                buf.put_u8(self.wire[pos]);
                buf.extend(self.wire[pos + 1..end].iter().map(u8::to_ascii_lowercase));
            } else {
                buf.put_slice(&self.wire[pos..end]);
            }
            pos = end;
        }

        buf.put_u8(0);
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses a presentation-format name. A trailing dot is implied.
    fn from_str(s: &str) -> Result<Self> {
        let parsed = parse::parse_text_labels(s)?;
        Ok(Self::finish(parsed.wire, parsed.label_count))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels().filter(|l| !l.is_root()) {
            write!(f, "{label}.")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(\"{self}\")")
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in &self.wire {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    /// Canonical DNS name ordering per RFC 4034, compared from the root.
    fn cmp(&self, other: &Self) -> Ordering {
        let a: SmallVec<[Label<'_>; 8]> = self.labels().collect();
        let b: SmallVec<[Label<'_>; 8]> = other.labels().collect();

        for (x, y) in a.iter().rev().zip(b.iter().rev()) {
            match x.cmp_canonical(y) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        a.len().cmp(&b.len())
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::root()
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    #[test]
    fn test_root_name() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.label_count(), 1);
        assert_eq!(root.to_string(), ".");
        assert_eq!(name("."), root);
        assert_eq!(name(""), root);
    }

    #[test]
    fn test_name_parsing() {
        let n = name("www.example.com.");
        assert_eq!(n.label_count(), 4);
        assert_eq!(n.to_string(), "www.example.com.");
        assert_eq!(n, name("www.example.com"));
        assert_eq!(n.wire_len(), 17);
    }

    #[test]
    fn test_escaped_round_trip() {
        let n = name("a\\.b.example.");
        assert_eq!(n.label_count(), 3);
        assert_eq!(n.to_string(), "a\\.b.example.");
        assert_eq!(name(&n.to_string()), n);
    }

    #[test]
    fn test_case_insensitive_comparison() {
        assert_eq!(name("www.example.com"), name("WWW.EXAMPLE.COM"));
        let mut set = std::collections::HashSet::new();
        set.insert(name("Example.COM"));
        assert!(set.contains(&name("example.com")));
    }

    #[test]
    fn test_parse_relative() {
        let origin = name("example.com.");
        assert_eq!(Name::parse_relative("@", &origin).unwrap(), origin);
        assert_eq!(
            Name::parse_relative("www", &origin).unwrap(),
            name("www.example.com.")
        );
        assert_eq!(
            Name::parse_relative("mail.other.org.", &origin).unwrap(),
            name("mail.other.org.")
        );
    }

    #[test]
    fn test_parent_and_subdomain() {
        let n = name("www.example.com");
        let parent = n.parent().unwrap();
        assert_eq!(parent.to_string(), "example.com.");
        assert!(n.is_subdomain_of(&parent));
        assert!(n.is_subdomain_of(&Name::root()));
        assert!(!parent.is_subdomain_of(&n));
        assert!(!name("xexample.com").is_subdomain_of(&parent));
        assert!(Name::root().parent().is_none());
    }

    #[test]
    fn test_limits() {
        assert!(matches!(
            Name::from_str(&"a".repeat(64)),
            Err(Error::LabelTooLong { .. })
        ));
        let long = vec!["abcdefghi"; 26].join(".");
        assert!(matches!(
            Name::from_str(&long),
            Err(Error::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_encode_with_compression() {
        let mut table = CompressionTable::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&[0u8; 12]);

        name("example.com").encode(&mut buf, Some(&mut table), false);
        name("www.EXAMPLE.com").encode(&mut buf, Some(&mut table), false);

        assert_eq!(buf.len(), 12 + 13 + 4 + 2);
        assert_eq!(&buf[29..31], &[0xC0, 12]);

        let (parsed, _) = NameParser::new(&buf).parse_name(25).unwrap();
        assert_eq!(parsed, name("www.example.com"));
    }

    #[test]
    fn test_encode_canonical() {
        let mut table = CompressionTable::new();
        let mut buf = BytesMut::new();
        name("Example.COM").encode(&mut buf, Some(&mut table), true);
        name("example.com").encode(&mut buf, Some(&mut table), true);

        assert!(table.is_empty());
        assert_eq!(&buf[..13], b"\x07example\x03com\x00");
        assert_eq!(&buf[13..], &buf[..13]);
    }

    #[test]
    fn test_from_wire() {
        let n = Name::from_wire(b"\x03www\x00").unwrap();
        assert_eq!(n.to_string(), "www.");
        assert!(Name::from_wire(b"\x03www\x00\x01").is_err());
    }

    #[test]
    fn test_canonical_ordering() {
        let ordered: Vec<Name> = [
            "example.",
            "a.example.",
            "yljkjljk.a.example.",
            "Z.a.example.",
            "zABC.a.EXAMPLE.",
            "z.example.",
            "\\001.z.example.",
            "*.z.example.",
        ]
        .iter()
        .map(|s| name(s))
        .collect();

        let mut sorted = ordered.clone();
        sorted.reverse();
        sorted.sort();
        assert_eq!(sorted, ordered);
    }
}
