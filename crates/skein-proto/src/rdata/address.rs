//! Address record types (A, AAAA).

use super::{expect_tokens, parse_token, RecordData};
use crate::error::{Error, Result};
use crate::name::{CompressionTable, Name};
use crate::wire::rdata_end;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A record - IPv4 address (RFC 1035).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct A {
    address: Ipv4Addr,
}

impl A {
    /// Creates a new A record.
    #[inline]
    pub const fn new(address: Ipv4Addr) -> Self {
        Self { address }
    }

    /// Returns the IPv4 address.
    #[inline]
    pub const fn address(&self) -> Ipv4Addr {
        self.address
    }
}

impl RecordData for A {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let end = rdata_end(message, offset, rdlength)?;
        let octets: [u8; 4] = message[offset..end]
            .try_into()
            .map_err(|_| Error::rdata_length("A", 4, rdlength as usize))?;
        Ok(Self::new(Ipv4Addr::from(octets)))
    }

    fn parse_text(_origin: &Name, tokens: &[&str]) -> Result<Self> {
        expect_tokens("A", tokens, 1, 1)?;
        parse_token("A", tokens[0]).map(Self::new)
    }

    fn max_encoded_len(&self) -> usize {
        4
    }

    fn encode(&self, buf: &mut BytesMut, _: Option<&mut CompressionTable>, _: bool) {
        buf.put_slice(&self.address.octets());
    }
}

impl fmt::Display for A {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl From<Ipv4Addr> for A {
    fn from(address: Ipv4Addr) -> Self {
        Self::new(address)
    }
}

/// AAAA record - IPv6 address (RFC 3596).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AAAA {
    address: Ipv6Addr,
}

impl AAAA {
    /// Creates a new AAAA record.
    #[inline]
    pub const fn new(address: Ipv6Addr) -> Self {
        Self { address }
    }

    /// Returns the IPv6 address.
    #[inline]
    pub const fn address(&self) -> Ipv6Addr {
        self.address
    }
}

impl RecordData for AAAA {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let end = rdata_end(message, offset, rdlength)?;
        let octets: [u8; 16] = message[offset..end]
            .try_into()
            .map_err(|_| Error::rdata_length("AAAA", 16, rdlength as usize))?;
        Ok(Self::new(Ipv6Addr::from(octets)))
    }

    fn parse_text(_origin: &Name, tokens: &[&str]) -> Result<Self> {
        expect_tokens("AAAA", tokens, 1, 1)?;
        parse_token("AAAA", tokens[0]).map(Self::new)
    }

    fn max_encoded_len(&self) -> usize {
        16
    }

    fn encode(&self, buf: &mut BytesMut, _: Option<&mut CompressionTable>, _: bool) {
        buf.put_slice(&self.address.octets());
    }
}

impl fmt::Display for AAAA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl From<Ipv6Addr> for AAAA {
    fn from(address: Ipv6Addr) -> Self {
        Self::new(address)
    }
}
