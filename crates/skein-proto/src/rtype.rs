//! Record type codes.
//!
//! [`RecordType`] names the assigned codes this codec knows by mnemonic;
//! [`Type`] is any 16-bit value and is what records and questions carry.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Assigned record types.
///
/// Only a subset of these has a typed RDATA variant; the rest decode as
/// opaque data but still print by mnemonic.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum RecordType {
    // =========================================================================
    // RFC 1035 and early extensions
    // =========================================================================
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    NULL = 10,
    PTR = 12,
    HINFO = 13,
    MINFO = 14,
    MX = 15,
    TXT = 16,
    RP = 17,
    AFSDB = 18,
    X25 = 19,
    ISDN = 20,
    RT = 21,
    AAAA = 28,
    LOC = 29,
    SRV = 33,
    NAPTR = 35,
    KX = 36,
    CERT = 37,
    DNAME = 39,
    OPT = 41,
    APL = 42,

    // =========================================================================
    // DNSSEC and key material
    // =========================================================================
    DS = 43,
    SSHFP = 44,
    IPSECKEY = 45,
    RRSIG = 46,
    NSEC = 47,
    DNSKEY = 48,
    DHCID = 49,
    NSEC3 = 50,
    NSEC3PARAM = 51,
    TLSA = 52,
    SMIMEA = 53,
    HIP = 55,
    CDS = 59,
    CDNSKEY = 60,
    OPENPGPKEY = 61,
    CSYNC = 62,
    ZONEMD = 63,
    SVCB = 64,
    HTTPS = 65,
    SPF = 99,
    URI = 256,
    CAA = 257,

    // =========================================================================
    // Meta and query types
    // =========================================================================
    TKEY = 249,
    TSIG = 250,
    IXFR = 251,
    AXFR = 252,
    ANY = 255,
}

impl RecordType {
    /// Creates a record type from its numeric value.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns true for full and incremental zone transfer queries.
    #[inline]
    pub const fn is_zone_transfer(self) -> bool {
        matches!(self, Self::AXFR | Self::IXFR)
    }

    /// Returns the mnemonic of the type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::NS => "NS",
            Self::CNAME => "CNAME",
            Self::SOA => "SOA",
            Self::NULL => "NULL",
            Self::PTR => "PTR",
            Self::HINFO => "HINFO",
            Self::MINFO => "MINFO",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::RP => "RP",
            Self::AFSDB => "AFSDB",
            Self::X25 => "X25",
            Self::ISDN => "ISDN",
            Self::RT => "RT",
            Self::AAAA => "AAAA",
            Self::LOC => "LOC",
            Self::SRV => "SRV",
            Self::NAPTR => "NAPTR",
            Self::KX => "KX",
            Self::CERT => "CERT",
            Self::DNAME => "DNAME",
            Self::OPT => "OPT",
            Self::APL => "APL",
            Self::DS => "DS",
            Self::SSHFP => "SSHFP",
            Self::IPSECKEY => "IPSECKEY",
            Self::RRSIG => "RRSIG",
            Self::NSEC => "NSEC",
            Self::DNSKEY => "DNSKEY",
            Self::DHCID => "DHCID",
            Self::NSEC3 => "NSEC3",
            Self::NSEC3PARAM => "NSEC3PARAM",
            Self::TLSA => "TLSA",
            Self::SMIMEA => "SMIMEA",
            Self::HIP => "HIP",
            Self::CDS => "CDS",
            Self::CDNSKEY => "CDNSKEY",
            Self::OPENPGPKEY => "OPENPGPKEY",
            Self::CSYNC => "CSYNC",
            Self::ZONEMD => "ZONEMD",
            Self::SVCB => "SVCB",
            Self::HTTPS => "HTTPS",
            Self::SPF => "SPF",
            Self::URI => "URI",
            Self::CAA => "CAA",
            Self::TKEY => "TKEY",
            Self::TSIG => "TSIG",
            Self::IXFR => "IXFR",
            Self::AXFR => "AXFR",
            Self::ANY => "ANY",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any 16-bit type value, assigned or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    /// An assigned type.
    Known(RecordType),
    /// Any other value (`TYPE<n>` in text, RFC 3597).
    Unknown(u16),
}

impl Type {
    /// Creates a type from a u16 value.
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordType::from_u16(value).map_or(Self::Unknown(value), Self::Known)
    }

    /// Returns the numeric value.
    #[inline]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Known(t) => t.into(),
            Self::Unknown(v) => v,
        }
    }

    /// Returns the assigned type, if any.
    #[inline]
    pub const fn as_known(self) -> Option<RecordType> {
        match self {
            Self::Known(t) => Some(t),
            Self::Unknown(_) => None,
        }
    }

    /// Returns true if this is the given assigned type.
    #[inline]
    pub fn is(self, rtype: RecordType) -> bool {
        self == Self::Known(rtype)
    }
}

impl From<RecordType> for Type {
    fn from(t: RecordType) -> Self {
        Self::Known(t)
    }
}

impl From<u16> for Type {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl Default for Type {
    fn default() -> Self {
        Self::Known(RecordType::A)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(t) => write!(f, "{t}"),
            Self::Unknown(v) => write!(f, "TYPE{v}"),
        }
    }
}

impl FromStr for Type {
    type Err = Error;

    /// Accepts a mnemonic (case-insensitive) or the `TYPE<n>` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        if let Some(number) = upper.strip_prefix("TYPE") {
            if let Ok(value) = number.parse::<u16>() {
                return Ok(Self::from_u16(value));
            }
        }
        (1..=u16::MAX)
            .filter_map(RecordType::from_u16)
            .find(|t| t.name() == upper)
            .map(Self::Known)
            .ok_or_else(|| Error::invalid_data(0, format!("unknown record type '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtype_values() {
        assert_eq!(u16::from(RecordType::ISDN), 20);
        assert_eq!(u16::from(RecordType::SSHFP), 44);
        assert_eq!(RecordType::from_u16(252), Some(RecordType::AXFR));
        assert_eq!(RecordType::from_u16(3), None);
    }

    #[test]
    fn test_generic_type() {
        assert_eq!(Type::from_u16(6), Type::Known(RecordType::SOA));
        assert!(Type::from_u16(6).is(RecordType::SOA));
        assert_eq!(Type::from_u16(65280).to_string(), "TYPE65280");
        assert_eq!(Type::from_u16(65280).to_u16(), 65280);
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("sshfp".parse::<Type>().unwrap(), RecordType::SSHFP.into());
        assert_eq!("TYPE44".parse::<Type>().unwrap(), RecordType::SSHFP.into());
        assert_eq!("TYPE999".parse::<Type>().unwrap(), Type::Unknown(999));
        assert!("NOPE".parse::<Type>().is_err());
    }

    #[test]
    fn test_zone_transfer_types() {
        assert!(RecordType::AXFR.is_zone_transfer());
        assert!(RecordType::IXFR.is_zone_transfer());
        assert!(!RecordType::SOA.is_zone_transfer());
    }
}
