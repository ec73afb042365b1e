//! DNS resource records.
//!
//! A resource record (RR) is the fundamental unit of DNS data,
//! containing a name, type, class, TTL, and record-specific data.

use crate::class::{Class, RecordClass};
use crate::error::{Error, Result};
use crate::name::{CompressionTable, Name, NameParser};
use crate::rdata::RData;
use crate::rtype::{RecordType, Type};
use crate::wire::WireReader;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS resource record.
///
/// # Wire Format
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                      NAME                     /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TYPE                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     CLASS                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TTL                      |
/// |                                               |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                   RDLENGTH                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                     RDATA                     /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRecord {
    name: Name,
    rtype: Type,
    rclass: Class,
    ttl: u32,
    rdata: RData,
}

impl ResourceRecord {
    /// Creates a new resource record.
    pub fn new(name: Name, rtype: Type, rclass: Class, ttl: u32, rdata: RData) -> Self {
        Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    /// Creates an IN-class record whose type is taken from the RDATA.
    pub fn from_rdata(name: Name, ttl: u32, rdata: RData) -> Self {
        Self::new(
            name,
            rdata.record_type(),
            Class::Known(RecordClass::IN),
            ttl,
            rdata,
        )
    }

    /// Returns the owner name.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the record type.
    #[inline]
    pub fn rtype(&self) -> Type {
        self.rtype
    }

    /// Returns true if the record has the given type.
    #[inline]
    pub fn is(&self, rtype: RecordType) -> bool {
        self.rtype.is(rtype)
    }

    /// Returns the record class.
    #[inline]
    pub fn rclass(&self) -> Class {
        self.rclass
    }

    /// Returns the time to live in seconds.
    #[inline]
    pub const fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Returns the record data.
    #[inline]
    pub fn rdata(&self) -> &RData {
        &self.rdata
    }

    /// Returns a copy with a different TTL.
    #[must_use]
    pub fn with_ttl(&self, ttl: u32) -> Self {
        Self {
            ttl,
            ..self.clone()
        }
    }

    /// Parses a resource record at `offset` of `message`.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn parse(message: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (name, name_len) = NameParser::new(message).parse_name(offset)?;

        let mut reader = WireReader::at(message, offset + name_len);
        let rtype = Type::from_u16(reader.read_u16()?);
        let rclass = Class::from_u16(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let rdlength = reader.read_u16()?;

        let rdata = RData::parse_wire(rtype, message, reader.position(), rdlength)?;
        let consumed = name_len + 10 + rdlength as usize;

        Ok((
            Self {
                name,
                rtype,
                rclass,
                ttl,
                rdata,
            },
            consumed,
        ))
    }

    /// Upper bound on the encoded size.
    pub fn max_encoded_len(&self) -> usize {
        self.name.wire_len() + 10 + self.rdata.max_encoded_len()
    }

    /// Writes the record, backfilling RDLENGTH once the RDATA is written.
    ///
    /// The owner name is compressed against `compression` unless `canonical`
    /// is set, in which case names are lowercased and written in full.
    pub fn encode(
        &self,
        buf: &mut BytesMut,
        mut compression: Option<&mut CompressionTable>,
        canonical: bool,
    ) -> Result<()> {
        self.name.encode(buf, compression.as_deref_mut(), canonical);
        buf.put_u16(self.rtype.to_u16());
        buf.put_u16(self.rclass.to_u16());
        buf.put_u32(self.ttl);

        let length_at = buf.len();
        buf.put_u16(0);
        self.rdata.encode(buf, compression, canonical);

        let length = buf.len() - length_at - 2;
        let rdlength = u16::try_from(length).map_err(|_| Error::RDataTooLong {
            rtype: self.rtype.to_string(),
            length,
        })?;
        buf[length_at..length_at + 2].copy_from_slice(&rdlength.to_be_bytes());
        Ok(())
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.rclass, self.rtype, self.rdata
        )
    }
}

/// Parser for resource record sections.
#[derive(Debug)]
pub struct RecordParser<'a> {
    data: &'a [u8],
    offset: usize,
    remaining: u16,
}

impl<'a> RecordParser<'a> {
    /// Creates a parser for `count` records starting at `offset`.
    #[inline]
    pub const fn new(data: &'a [u8], offset: usize, count: u16) -> Self {
        Self {
            data,
            offset,
            remaining: count,
        }
    }

    /// Returns the current offset.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Parses the next record.
    pub fn next(&mut self) -> Result<Option<ResourceRecord>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let (record, consumed) = ResourceRecord::parse(self.data, self.offset)?;
        self.offset += consumed;
        self.remaining -= 1;

        Ok(Some(record))
    }
}
