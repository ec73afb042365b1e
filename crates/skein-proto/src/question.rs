//! DNS question section.

use crate::class::{Class, RecordClass};
use crate::error::Result;
use crate::name::{CompressionTable, Name, NameParser};
use crate::rtype::{RecordType, Type};
use crate::wire::WireReader;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS question.
///
/// # Wire Format
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                     QNAME                     /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     QTYPE                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     QCLASS                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    /// The domain name being queried.
    pub qname: Name,

    /// The type of record being requested.
    pub qtype: Type,

    /// The class of the query (usually IN for Internet).
    pub qclass: Class,
}

impl Question {
    /// Creates a new question.
    #[inline]
    pub fn new(qname: Name, qtype: RecordType, qclass: RecordClass) -> Self {
        Self {
            qname,
            qtype: Type::Known(qtype),
            qclass: Class::Known(qclass),
        }
    }

    /// Creates a new question with generic type and class.
    #[inline]
    pub fn new_generic(qname: Name, qtype: Type, qclass: Class) -> Self {
        Self { qname, qtype, qclass }
    }

    /// Creates an IN-class question.
    #[inline]
    pub fn internet(qname: Name, qtype: RecordType) -> Self {
        Self::new(qname, qtype, RecordClass::IN)
    }

    /// Returns true for AXFR and IXFR questions.
    #[inline]
    pub fn is_zone_transfer(&self) -> bool {
        self.qtype.as_known().is_some_and(RecordType::is_zone_transfer)
    }

    /// Parses a question from wire format.
    ///
    /// Returns the question and the number of bytes consumed.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (qname, name_len) = NameParser::new(data).parse_name(offset)?;

        let mut reader = WireReader::at(data, offset + name_len);
        let qtype = Type::from_u16(reader.read_u16()?);
        let qclass = Class::from_u16(reader.read_u16()?);

        Ok((Self { qname, qtype, qclass }, name_len + 4))
    }

    /// Upper bound on the encoded size.
    #[inline]
    pub fn max_encoded_len(&self) -> usize {
        self.qname.wire_len() + 4
    }

    /// Writes the question, compressing the name against `compression`.
    pub fn encode(
        &self,
        buf: &mut BytesMut,
        compression: Option<&mut CompressionTable>,
        canonical: bool,
    ) {
        self.qname.encode(buf, compression, canonical);
        buf.put_u16(self.qtype.to_u16());
        buf.put_u16(self.qclass.to_u16());
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t\t{}\t{}", self.qname, self.qclass, self.qtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_question_round_trip() {
        let q = Question::internet(Name::from_str("Example.COM").unwrap(), RecordType::AXFR);
        assert!(q.is_zone_transfer());

        let mut buf = BytesMut::new();
        q.encode(&mut buf, None, false);
        assert_eq!(buf.len(), q.max_encoded_len());

        let (parsed, consumed) = Question::parse(&buf, 0).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed, q);
    }

    #[test]
    fn test_canonical_question_lowercased() {
        let q = Question::internet(Name::from_str("Example.COM").unwrap(), RecordType::A);
        let mut buf = BytesMut::new();
        q.encode(&mut buf, None, true);
        assert_eq!(&buf[1..8], b"example");
        assert_eq!(&buf[9..12], b"com");
    }

    #[test]
    fn test_unknown_type_and_class() {
        let data = [0, 0xFF, 0x00, 0x00, 0x09];
        let (q, _) = Question::parse(&data, 0).unwrap();
        assert_eq!(q.qtype, Type::Unknown(0xFF00));
        assert_eq!(q.qclass.to_u16(), 9);
        assert!(!q.is_zone_transfer());
        assert!(Question::parse(&data[..4], 0).is_err());
    }
}
