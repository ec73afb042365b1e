//! Records whose data is, or ends in, a domain name (NS, CNAME, PTR, DNAME, MX).
//!
//! NS, CNAME, PTR and MX names may be compressed (RFC 1035). DNAME is a
//! later type and its target is always written in full (RFC 3597 section 4).

use super::{expect_tokens, parse_token, RecordData};
use crate::error::Result;
use crate::name::{CompressionTable, Name};
use crate::wire::{expect_consumed, rdata_end, WireReader};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! single_name_record {
    ($(#[$doc:meta])* $ty:ident, $mnemonic:literal, compress = $compress:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $ty {
            target: Name,
        }

        impl $ty {
            /// Creates the record.
            #[inline]
            pub fn new(target: Name) -> Self {
                Self { target }
            }

            /// Returns the embedded name.
            #[inline]
            pub fn target(&self) -> &Name {
                &self.target
            }
        }

        impl RecordData for $ty {
            fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
                rdata_end(message, offset, rdlength)?;
                let mut reader = WireReader::at(message, offset);
                let target = reader.read_name()?;
                expect_consumed($mnemonic, offset, reader.position(), rdlength)?;
                Ok(Self { target })
            }

            fn parse_text(origin: &Name, tokens: &[&str]) -> Result<Self> {
                expect_tokens($mnemonic, tokens, 1, 1)?;
                Name::parse_relative(tokens[0], origin).map(Self::new)
            }

            fn max_encoded_len(&self) -> usize {
                self.target.wire_len()
            }

            fn encode(
                &self,
                buf: &mut BytesMut,
                compression: Option<&mut CompressionTable>,
                canonical: bool,
            ) {
                let compression = if $compress { compression } else { None };
                self.target.encode(buf, compression, canonical);
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.target)
            }
        }
    };
}

single_name_record!(
    /// NS record - authoritative name server (RFC 1035).
    NS, "NS", compress = true
);
single_name_record!(
    /// CNAME record - canonical name of an alias (RFC 1035).
    CNAME, "CNAME", compress = true
);
single_name_record!(
    /// PTR record - domain name pointer (RFC 1035).
    PTR, "PTR", compress = true
);
single_name_record!(
    /// DNAME record - redirection of a subtree (RFC 6672).
    DNAME, "DNAME", compress = false
);

/// MX record - mail exchange (RFC 1035).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MX {
    preference: u16,
    exchange: Name,
}

impl MX {
    /// Creates a new MX record.
    #[inline]
    pub fn new(preference: u16, exchange: Name) -> Self {
        Self {
            preference,
            exchange,
        }
    }

    /// Returns the preference (lower is preferred).
    #[inline]
    pub const fn preference(&self) -> u16 {
        self.preference
    }

    /// Returns the mail exchange host.
    #[inline]
    pub fn exchange(&self) -> &Name {
        &self.exchange
    }
}

impl RecordData for MX {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        rdata_end(message, offset, rdlength)?;
        let mut reader = WireReader::at(message, offset);
        let preference = reader.read_u16()?;
        let exchange = reader.read_name()?;
        expect_consumed("MX", offset, reader.position(), rdlength)?;
        Ok(Self::new(preference, exchange))
    }

    fn parse_text(origin: &Name, tokens: &[&str]) -> Result<Self> {
        expect_tokens("MX", tokens, 2, 2)?;
        Ok(Self::new(
            parse_token("MX", tokens[0])?,
            Name::parse_relative(tokens[1], origin)?,
        ))
    }

    fn max_encoded_len(&self) -> usize {
        2 + self.exchange.wire_len()
    }

    fn encode(&self, buf: &mut BytesMut, compression: Option<&mut CompressionTable>, canonical: bool) {
        buf.put_u16(self.preference);
        self.exchange.encode(buf, compression, canonical);
    }
}

impl fmt::Display for MX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.exchange)
    }
}
