//! SOA record.

use super::{expect_tokens, parse_token, RecordData};
use crate::error::Result;
use crate::name::{CompressionTable, Name};
use crate::wire::{expect_consumed, rdata_end, WireReader};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SOA record - start of a zone of authority (RFC 1035).
///
/// Zone transfers open and close with the zone's SOA, so the transport
/// watches for this type to find the end of a multi-message transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SOA {
    mname: Name,
    rname: Name,
    serial: u32,
    refresh: u32,
    retry: u32,
    expire: u32,
    minimum: u32,
}

impl SOA {
    /// Creates a new SOA record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mname: Name,
        rname: Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    ) -> Self {
        Self {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        }
    }

    /// Returns the primary name server.
    #[inline]
    pub fn mname(&self) -> &Name {
        &self.mname
    }

    /// Returns the mailbox of the person responsible for the zone.
    #[inline]
    pub fn rname(&self) -> &Name {
        &self.rname
    }

    /// Returns the zone serial number.
    #[inline]
    pub const fn serial(&self) -> u32 {
        self.serial
    }

    /// Returns the refresh interval in seconds.
    #[inline]
    pub const fn refresh(&self) -> u32 {
        self.refresh
    }

    /// Returns the retry interval in seconds.
    #[inline]
    pub const fn retry(&self) -> u32 {
        self.retry
    }

    /// Returns the expire limit in seconds.
    #[inline]
    pub const fn expire(&self) -> u32 {
        self.expire
    }

    /// Returns the negative caching TTL in seconds.
    #[inline]
    pub const fn minimum(&self) -> u32 {
        self.minimum
    }
}

impl RecordData for SOA {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        rdata_end(message, offset, rdlength)?;
        let mut reader = WireReader::at(message, offset);
        let soa = Self {
            mname: reader.read_name()?,
            rname: reader.read_name()?,
            serial: reader.read_u32()?,
            refresh: reader.read_u32()?,
            retry: reader.read_u32()?,
            expire: reader.read_u32()?,
            minimum: reader.read_u32()?,
        };
        expect_consumed("SOA", offset, reader.position(), rdlength)?;
        Ok(soa)
    }

    fn parse_text(origin: &Name, tokens: &[&str]) -> Result<Self> {
        expect_tokens("SOA", tokens, 7, 7)?;
        Ok(Self {
            mname: Name::parse_relative(tokens[0], origin)?,
            rname: Name::parse_relative(tokens[1], origin)?,
            serial: parse_token("SOA", tokens[2])?,
            refresh: parse_token("SOA", tokens[3])?,
            retry: parse_token("SOA", tokens[4])?,
            expire: parse_token("SOA", tokens[5])?,
            minimum: parse_token("SOA", tokens[6])?,
        })
    }

    fn max_encoded_len(&self) -> usize {
        self.mname.wire_len() + self.rname.wire_len() + 20
    }

    fn encode(&self, buf: &mut BytesMut, mut compression: Option<&mut CompressionTable>, canonical: bool) {
        self.mname.encode(buf, compression.as_deref_mut(), canonical);
        self.rname.encode(buf, compression, canonical);
        buf.put_u32(self.serial);
        buf.put_u32(self.refresh);
        buf.put_u32(self.retry);
        buf.put_u32(self.expire);
        buf.put_u32(self.minimum);
    }
}

impl fmt::Display for SOA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire, self.minimum
        )
    }
}
