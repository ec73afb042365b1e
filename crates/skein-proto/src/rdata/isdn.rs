//! ISDN record (RFC 1183 section 3.2).

use super::text::check_string_len;
use super::{expect_tokens, RecordData};
use crate::error::Result;
use crate::name::{CompressionTable, Name};
use crate::wire::{
    expect_consumed, fmt_character_string, parse_character_string, rdata_end,
    write_character_string, WireReader,
};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISDN record - an ISDN telephone number with an optional sub-address.
///
/// On the wire the sub-address string is present only when bytes remain
/// inside the RDATA; an absent sub-address reads as empty. Encoding always
/// writes both strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ISDN {
    address: Vec<u8>,
    sub_address: Vec<u8>,
}

impl ISDN {
    /// Creates an ISDN record with an empty sub-address.
    ///
    /// Fails if the address is longer than 255 bytes.
    pub fn new(address: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_sub_address(address, Vec::new())
    }

    /// Creates an ISDN record with a sub-address.
    ///
    /// Fails if either string is longer than 255 bytes.
    pub fn with_sub_address(
        address: impl Into<Vec<u8>>,
        sub_address: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let address = address.into();
        let sub_address = sub_address.into();
        check_string_len("ISDN", &address)?;
        check_string_len("ISDN", &sub_address)?;
        Ok(Self {
            address,
            sub_address,
        })
    }

    /// Returns the ISDN address.
    pub fn address(&self) -> &[u8] {
        &self.address
    }

    /// Returns the sub-address, empty when absent.
    pub fn sub_address(&self) -> &[u8] {
        &self.sub_address
    }
}

impl RecordData for ISDN {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let end = rdata_end(message, offset, rdlength)?;
        let mut reader = WireReader::at(&message[..end], offset);

        let address = reader.read_character_string()?.to_vec();
        let sub_address = if reader.position() < end {
            reader.read_character_string()?.to_vec()
        } else {
            Vec::new()
        };

        expect_consumed("ISDN", offset, reader.position(), rdlength)?;
        Ok(Self {
            address,
            sub_address,
        })
    }

    fn parse_text(_origin: &Name, tokens: &[&str]) -> Result<Self> {
        expect_tokens("ISDN", tokens, 1, 2)?;
        let address = parse_character_string(tokens[0])?;
        let sub_address = match tokens.get(1) {
            Some(token) => parse_character_string(token)?,
            None => Vec::new(),
        };
        Self::with_sub_address(address, sub_address)
    }

    fn max_encoded_len(&self) -> usize {
        2 + self.address.len() + self.sub_address.len()
    }

    fn encode(&self, buf: &mut BytesMut, _: Option<&mut CompressionTable>, _: bool) {
        write_character_string(buf, &self.address);
        write_character_string(buf, &self.sub_address);
    }
}

impl fmt::Display for ISDN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_character_string(f, &self.address)?;
        if !self.sub_address.is_empty() {
            f.write_str(" ")?;
            fmt_character_string(f, &self.sub_address)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_isdn_text_parse() {
        let isdn = ISDN::parse_text(&Name::root(), &["12345", "001"]).unwrap();
        assert_eq!(isdn.address(), b"12345");
        assert_eq!(isdn.sub_address(), b"001");
        assert_eq!(isdn.to_string(), "\"12345\" \"001\"");
    }

    #[test]
    fn test_isdn_token_count() {
        let origin = Name::root();
        assert!(matches!(
            ISDN::parse_text(&origin, &[]),
            Err(Error::InvalidTokenCount { actual: 0, .. })
        ));
        let err = ISDN::parse_text(&origin, &["1", "2", "3"]).unwrap_err();
        assert!(matches!(err, Error::InvalidTokenCount { actual: 3, .. }));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_isdn_without_sub_address() {
        let wire = [5, b'1', b'2', b'3', b'4', b'5'];
        let isdn = ISDN::parse_wire(&wire, 0, 6).unwrap();
        assert_eq!(isdn.address(), b"12345");
        assert!(isdn.sub_address().is_empty());
        assert_eq!(isdn.to_string(), "\"12345\"");

        // encode always writes the (empty) sub-address
        let mut buf = BytesMut::new();
        isdn.encode(&mut buf, None, false);
        assert_eq!(&buf[..], &[5, b'1', b'2', b'3', b'4', b'5', 0]);
        assert_eq!(ISDN::parse_wire(&buf, 0, 7).unwrap(), isdn);
    }

    #[test]
    fn test_isdn_sub_address_bounded_by_rdlength() {
        // a following record's bytes must not be read as the sub-address
        let wire = [3, b'1', b'2', b'3', 2, b'9', b'9'];
        let isdn = ISDN::parse_wire(&wire, 0, 4).unwrap();
        assert!(isdn.sub_address().is_empty());
    }

    #[test]
    fn test_isdn_rejects_long_address() {
        assert!(ISDN::new(vec![b'1'; 300]).is_err());
        assert!(ISDN::with_sub_address("12345", vec![b'0'; 256]).is_err());

        let isdn = ISDN::new(vec![b'1'; 255]).unwrap();
        let mut buf = BytesMut::new();
        isdn.encode(&mut buf, None, false);
        assert_eq!(buf.len(), 257);
        assert_eq!(ISDN::parse_wire(&buf, 0, 257).unwrap(), isdn);
    }

    #[test]
    fn test_isdn_max_len() {
        let isdn = ISDN::with_sub_address("150862028003217", "004").unwrap();
        let mut buf = BytesMut::new();
        isdn.encode(&mut buf, None, false);
        assert_eq!(isdn.max_encoded_len(), buf.len());
    }
}
