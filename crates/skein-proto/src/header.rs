//! The fixed 12-byte message header.
//!
//! Section counts are not stored here; they are derived from the section
//! lengths when a message is encoded and returned alongside the header when
//! one is parsed.

use crate::error::{Error, Result};
use crate::opcode::OpCode;
use crate::rcode::ResponseCode;
use bitflags::bitflags;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

/// Size of the DNS header in bytes.
pub const HEADER_SIZE: usize = 12;

const OPCODE_SHIFT: u16 = 11;
const OPCODE_MASK: u16 = 0x7800;
const RCODE_MASK: u16 = 0x000F;

bitflags! {
    /// Single-bit header flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HeaderFlags: u16 {
        /// Query (0) or response (1)
        const QR = 0x8000;
        /// Authoritative answer
        const AA = 0x0400;
        /// Truncated
        const TC = 0x0200;
        /// Recursion desired
        const RD = 0x0100;
        /// Recursion available
        const RA = 0x0080;
        /// Reserved, must be zero
        const Z = 0x0040;
        /// Authentic data (RFC 4035)
        const AD = 0x0020;
        /// Checking disabled (RFC 4035)
        const CD = 0x0010;
    }
}

/// Number of entries in each section, in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionCounts {
    /// QDCOUNT
    pub questions: u16,
    /// ANCOUNT
    pub answers: u16,
    /// NSCOUNT
    pub authority: u16,
    /// ARCOUNT
    pub additional: u16,
}

/// DNS message header without its counts.
///
/// ```text
///   0  1  2  3  4  5  6  7  8  9 10 11 12 13 14 15
/// |                      ID                       |
/// |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
/// |          QDCOUNT / ANCOUNT / NSCOUNT / ARCOUNT |
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Transaction identifier.
    pub id: u16,
    /// Single-bit flags.
    pub flags: HeaderFlags,
    /// Operation code.
    pub opcode: OpCode,
    /// Low 4 bits of the response code.
    pub rcode_bits: u8,
}

impl Header {
    /// Creates a query header with the given id.
    #[inline]
    pub const fn new(id: u16) -> Self {
        Self {
            id,
            flags: HeaderFlags::empty(),
            opcode: OpCode::Query,
            rcode_bits: 0,
        }
    }

    /// Returns true if `flag` is set.
    #[inline]
    pub fn has(&self, flag: HeaderFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Sets or clears `flag`.
    #[inline]
    pub fn set(&mut self, flag: HeaderFlags, value: bool) {
        self.flags.set(flag, value);
    }

    /// Returns the header response code (without EDNS extension).
    #[inline]
    pub fn rcode(&self) -> ResponseCode {
        ResponseCode::from_parts(self.rcode_bits, 0)
    }

    /// Parses the header and section counts.
    pub fn parse(data: &[u8]) -> Result<(Self, SectionCounts)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::buffer_too_short(HEADER_SIZE, data.len()));
        }
        let word = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);

        let raw = word(2);
        #[allow(clippy::cast_possible_truncation)]
        let opcode_value = ((raw & OPCODE_MASK) >> OPCODE_SHIFT) as u8;
        let opcode =
            OpCode::from_u8(opcode_value).ok_or(Error::InvalidOpCode { value: opcode_value })?;

        #[allow(clippy::cast_possible_truncation)]
        let header = Self {
            id: word(0),
            flags: HeaderFlags::from_bits_truncate(raw),
            opcode,
            rcode_bits: (raw & RCODE_MASK) as u8,
        };
        let counts = SectionCounts {
            questions: word(4),
            answers: word(6),
            authority: word(8),
            additional: word(10),
        };
        Ok((header, counts))
    }

    /// Writes the header with the given counts.
    pub fn write_to(&self, buf: &mut BytesMut, counts: SectionCounts) {
        let raw = self.flags.bits()
            | ((u16::from(self.opcode.to_u8()) << OPCODE_SHIFT) & OPCODE_MASK)
            | (u16::from(self.rcode_bits) & RCODE_MASK);

        buf.reserve(HEADER_SIZE);
        buf.put_u16(self.id);
        buf.put_u16(raw);
        buf.put_u16(counts.questions);
        buf.put_u16(counts.answers);
        buf.put_u16(counts.authority);
        buf.put_u16(counts.additional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let mut header = Header::new(0xBEEF);
        header.set(HeaderFlags::QR, true);
        header.set(HeaderFlags::RD, true);
        header.set(HeaderFlags::CD, true);
        header.opcode = OpCode::Notify;
        header.rcode_bits = 3;

        let counts = SectionCounts {
            questions: 1,
            answers: 2,
            authority: 3,
            additional: 4,
        };
        let mut buf = BytesMut::new();
        header.write_to(&mut buf, counts);
        assert_eq!(buf.len(), HEADER_SIZE);

        let (parsed, parsed_counts) = Header::parse(&buf).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed_counts, counts);
        assert_eq!(parsed.rcode(), ResponseCode::NXDomain);
    }

    #[test]
    fn test_flag_bits() {
        // QR, opcode QUERY, RD, RA, rcode NOERROR
        let data = [0x12, 0x34, 0x81, 0x80, 0, 1, 0, 0, 0, 0, 0, 0];
        let (header, counts) = Header::parse(&data).unwrap();
        assert_eq!(header.id, 0x1234);
        assert!(header.has(HeaderFlags::QR));
        assert!(header.has(HeaderFlags::RD));
        assert!(header.has(HeaderFlags::RA));
        assert!(!header.has(HeaderFlags::TC));
        assert_eq!(header.opcode, OpCode::Query);
        assert_eq!(counts.questions, 1);
    }

    #[test]
    fn test_header_too_short() {
        assert!(matches!(
            Header::parse(&[0u8; 11]),
            Err(Error::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_unassigned_opcode() {
        let data = [0, 0, 0x18, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            Header::parse(&data),
            Err(Error::InvalidOpCode { value: 3 })
        ));
    }
}
