//! Response codes.
//!
//! The header carries the low 4 bits; with EDNS the OPT record supplies the
//! upper 8 bits, giving a 12-bit code (RFC 6891 section 6.1.3).

use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS response code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    FromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum ResponseCode {
    /// No error condition - RFC 1035
    NoError = 0,

    /// The server could not interpret the query - RFC 1035
    FormErr = 1,

    /// The server failed to process the query - RFC 1035
    ServFail = 2,

    /// The queried name does not exist - RFC 1035
    NXDomain = 3,

    /// The kind of query is not supported - RFC 1035
    NotImp = 4,

    /// The server refuses for policy reasons - RFC 1035
    Refused = 5,

    /// Name exists when it should not - RFC 2136
    YXDomain = 6,

    /// RR set exists when it should not - RFC 2136
    YXRRSet = 7,

    /// RR set that should exist does not - RFC 2136
    NXRRSet = 8,

    /// Not authoritative for zone - RFC 2136
    NotAuth = 9,

    /// Name not contained in zone - RFC 2136
    NotZone = 10,

    /// Unsupported EDNS version - RFC 6891
    BadVers = 16,

    /// Bad or missing server cookie - RFC 7873
    BadCookie = 23,

    /// Any other value.
    #[num_enum(catch_all)]
    Unknown(u16),
}

impl Default for ResponseCode {
    fn default() -> Self {
        Self::NoError
    }
}

impl ResponseCode {
    /// Returns the full 12-bit numeric value.
    #[inline]
    pub fn to_u16(self) -> u16 {
        self.into()
    }

    /// Returns the 4 bits stored in the header.
    #[inline]
    pub fn header_bits(self) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        let low = (self.to_u16() & 0x0F) as u8;
        low
    }

    /// Returns the 8 bits stored in the OPT record TTL.
    #[inline]
    pub fn extended_bits(self) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        let high = ((self.to_u16() >> 4) & 0xFF) as u8;
        high
    }

    /// Combines the header bits and the OPT extension into one code.
    #[inline]
    pub fn from_parts(header_bits: u8, extended_bits: u8) -> Self {
        Self::from((u16::from(extended_bits) << 4) | u16::from(header_bits & 0x0F))
    }

    /// Returns true if the code needs EDNS to be expressed.
    #[inline]
    pub fn is_extended(self) -> bool {
        self.to_u16() > 0x0F
    }

    /// Returns the mnemonic used in dig-style output.
    pub fn name(self) -> std::borrow::Cow<'static, str> {
        let name = match self {
            Self::NoError => "NOERROR",
            Self::FormErr => "FORMERR",
            Self::ServFail => "SERVFAIL",
            Self::NXDomain => "NXDOMAIN",
            Self::NotImp => "NOTIMP",
            Self::Refused => "REFUSED",
            Self::YXDomain => "YXDOMAIN",
            Self::YXRRSet => "YXRRSET",
            Self::NXRRSet => "NXRRSET",
            Self::NotAuth => "NOTAUTH",
            Self::NotZone => "NOTZONE",
            Self::BadVers => "BADVERS",
            Self::BadCookie => "BADCOOKIE",
            Self::Unknown(v) => return format!("RCODE{v}").into(),
        };
        name.into()
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rcode_values() {
        assert_eq!(ResponseCode::NoError.to_u16(), 0);
        assert_eq!(ResponseCode::NXDomain.to_u16(), 3);
        assert_eq!(ResponseCode::from(16), ResponseCode::BadVers);
        assert_eq!(ResponseCode::from(14), ResponseCode::Unknown(14));
        assert_eq!(ResponseCode::Unknown(14).to_u16(), 14);
        assert_eq!(ResponseCode::default(), ResponseCode::NoError);
    }

    #[test]
    fn test_rcode_parts() {
        assert_eq!(ResponseCode::BadVers.header_bits(), 0);
        assert_eq!(ResponseCode::BadVers.extended_bits(), 1);
        assert_eq!(ResponseCode::from_parts(0, 1), ResponseCode::BadVers);
        assert_eq!(ResponseCode::from_parts(3, 0), ResponseCode::NXDomain);
        assert!(ResponseCode::BadCookie.is_extended());
        assert!(!ResponseCode::Refused.is_extended());
    }

    #[test]
    fn test_rcode_display() {
        assert_eq!(ResponseCode::ServFail.to_string(), "SERVFAIL");
        assert_eq!(ResponseCode::Unknown(3000).to_string(), "RCODE3000");
    }
}
