//! Opaque RDATA for types without a typed variant (RFC 3597).

use super::parse_token;
use crate::error::{Error, Result};
use crate::name::CompressionTable;
use crate::rtype::Type;
use bytes::BytesMut;
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw RDATA kept byte-for-byte, rendered as `\# <length> <hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unknown {
    rtype: Type,
    data: Vec<u8>,
}

impl Unknown {
    /// Wraps raw RDATA of the given type.
    pub fn new(rtype: Type, data: impl Into<Vec<u8>>) -> Self {
        Self {
            rtype,
            data: data.into(),
        }
    }

    /// Returns the type code the data was carried under.
    #[inline]
    pub const fn rtype(&self) -> Type {
        self.rtype
    }

    /// Returns the raw RDATA.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Parses the generic text form `\# <length> [<hex>...]`.
    pub fn parse_generic(rtype: Type, tokens: &[&str]) -> Result<Self> {
        let name = rtype.to_string();
        if tokens.len() < 2 || tokens[0] != "\\#" {
            return Err(Error::token_count(name, "\\# <length> <hex>", tokens.len()));
        }
        let length: usize = parse_token(&name, tokens[1])?;
        let hex = tokens[2..].concat();
        let data = HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| Error::invalid_token(name.as_str(), hex.as_str(), e.to_string()))?;
        if data.len() != length {
            return Err(Error::invalid_rdata(
                name,
                format!("declared length {length} but {} bytes given", data.len()),
            ));
        }
        Ok(Self { rtype, data })
    }

    /// Returns the encoded size, which is exact.
    #[inline]
    pub fn max_encoded_len(&self) -> usize {
        self.data.len()
    }

    /// Appends the raw bytes.
    pub fn encode(&self, buf: &mut BytesMut, _: Option<&mut CompressionTable>, _: bool) {
        buf.extend_from_slice(&self.data);
    }
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\# {}", self.data.len())?;
        if !self.data.is_empty() {
            write!(f, " {}", HEXLOWER.encode(&self.data))?;
        }
        Ok(())
    }
}
