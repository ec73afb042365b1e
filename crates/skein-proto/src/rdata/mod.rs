//! Record data (RDATA).
//!
//! Every typed variant implements [`RecordData`]: it parses itself from wire
//! bytes bounded by the record's RDLENGTH, parses itself from master-file
//! tokens, bounds its encoded size, encodes itself and renders its text form
//! through `Display`. [`RData`] is the sum over all variants and dispatches on
//! the 16-bit type code, falling back to [`Unknown`] for anything else.
//!
//! - **Address records**: A, AAAA
//! - **Name records**: NS, CNAME, PTR, DNAME, MX
//! - **Authority records**: SOA
//! - **Text records**: TXT, HINFO, ISDN
//! - **Key fingerprints**: SSHFP
//! - **Pseudo records**: OPT

pub mod address;
pub mod authority;
pub mod isdn;
pub mod name;
pub mod sshfp;
pub mod text;
pub mod unknown;

pub use address::{A, AAAA};
pub use authority::SOA;
pub use isdn::ISDN;
pub use name::{CNAME, DNAME, MX, NS, PTR};
pub use sshfp::{SshfpAlgorithm, SshfpFingerprintType, SSHFP};
pub use text::{HINFO, TXT};
pub use unknown::Unknown;

use crate::edns::Opt;
use crate::error::{Error, Result};
use crate::name::{CompressionTable, Name};
use crate::rtype::{RecordType, Type};
use crate::wire::rdata_end;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The operations every typed RDATA variant provides.
pub trait RecordData: Sized + fmt::Display {
    /// Parses the RDATA occupying `rdlength` bytes at `offset` of `message`.
    ///
    /// The whole message is passed so embedded names can follow compression
    /// pointers. Fixed-shape variants fail unless they consume exactly
    /// `rdlength` bytes.
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self>;

    /// Builds the RDATA from whitespace-separated master-file tokens.
    /// Relative names are completed with `origin`.
    fn parse_text(origin: &Name, tokens: &[&str]) -> Result<Self>;

    /// Upper bound on the bytes [`RecordData::encode`] writes.
    fn max_encoded_len(&self) -> usize;

    /// Appends the RDATA to `buf`.
    ///
    /// `compression` is only consulted by variants whose embedded names may
    /// be compressed; `canonical` lowercases embedded names and disables
    /// compression.
    fn encode(&self, buf: &mut BytesMut, compression: Option<&mut CompressionTable>, canonical: bool);
}

/// Parsed record data for any record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RData {
    // =========================================================================
    // Address Records
    // =========================================================================
    /// IPv4 address
    A(A),
    /// IPv6 address
    AAAA(AAAA),

    // =========================================================================
    // Name Records
    // =========================================================================
    /// Authoritative name server
    NS(NS),
    /// Canonical name
    CNAME(CNAME),
    /// Domain name pointer
    PTR(PTR),
    /// Subtree redirection
    DNAME(DNAME),
    /// Mail exchange
    MX(MX),

    // =========================================================================
    // Authority Records
    // =========================================================================
    /// Start of authority
    SOA(SOA),

    // =========================================================================
    // Text Records
    // =========================================================================
    /// Text strings
    TXT(TXT),
    /// Host information
    HINFO(HINFO),
    /// ISDN address
    ISDN(ISDN),

    // =========================================================================
    // Key Fingerprints
    // =========================================================================
    /// SSH key fingerprint
    SSHFP(SSHFP),

    // =========================================================================
    // Pseudo Records
    // =========================================================================
    /// EDNS option list
    OPT(Opt),

    // =========================================================================
    // Other
    // =========================================================================
    /// Any type without a typed variant, kept as raw bytes
    Unknown(Unknown),
}

macro_rules! dispatch {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            RData::A($inner) => $body,
            RData::AAAA($inner) => $body,
            RData::NS($inner) => $body,
            RData::CNAME($inner) => $body,
            RData::PTR($inner) => $body,
            RData::DNAME($inner) => $body,
            RData::MX($inner) => $body,
            RData::SOA($inner) => $body,
            RData::TXT($inner) => $body,
            RData::HINFO($inner) => $body,
            RData::ISDN($inner) => $body,
            RData::SSHFP($inner) => $body,
            RData::OPT($inner) => $body,
            RData::Unknown($inner) => $body,
        }
    };
}

impl RData {
    /// Parses RDATA of type `rtype` from the message.
    pub fn parse_wire(rtype: Type, message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let end = rdata_end(message, offset, rdlength)?;

        let Some(known) = rtype.as_known() else {
            return Ok(Self::Unknown(Unknown::new(rtype, &message[offset..end])));
        };

        Ok(match known {
            RecordType::A => Self::A(A::parse_wire(message, offset, rdlength)?),
            RecordType::AAAA => Self::AAAA(AAAA::parse_wire(message, offset, rdlength)?),
            RecordType::NS => Self::NS(NS::parse_wire(message, offset, rdlength)?),
            RecordType::CNAME => Self::CNAME(CNAME::parse_wire(message, offset, rdlength)?),
            RecordType::PTR => Self::PTR(PTR::parse_wire(message, offset, rdlength)?),
            RecordType::DNAME => Self::DNAME(DNAME::parse_wire(message, offset, rdlength)?),
            RecordType::MX => Self::MX(MX::parse_wire(message, offset, rdlength)?),
            RecordType::SOA => Self::SOA(SOA::parse_wire(message, offset, rdlength)?),
            RecordType::TXT => Self::TXT(TXT::parse_wire(message, offset, rdlength)?),
            RecordType::HINFO => Self::HINFO(HINFO::parse_wire(message, offset, rdlength)?),
            RecordType::ISDN => Self::ISDN(ISDN::parse_wire(message, offset, rdlength)?),
            RecordType::SSHFP => Self::SSHFP(SSHFP::parse_wire(message, offset, rdlength)?),
            RecordType::OPT => Self::OPT(Opt::parse_wire(message, offset, rdlength)?),
            _ => Self::Unknown(Unknown::new(rtype, &message[offset..end])),
        })
    }

    /// Parses RDATA of type `rtype` from master-file tokens.
    ///
    /// The RFC 3597 generic form `\# <length> <hex>` is accepted for every
    /// type; for types with a typed variant the bytes are then decoded as
    /// that variant.
    pub fn parse_text(rtype: Type, origin: &Name, tokens: &[&str]) -> Result<Self> {
        if tokens.first() == Some(&"\\#") {
            let generic = Unknown::parse_generic(rtype, tokens)?;
            let data = generic.data();
            let rdlength = u16::try_from(data.len())
                .map_err(|_| Error::invalid_rdata(rtype.to_string(), "generic RDATA too long"))?;
            return Self::parse_wire(rtype, data, 0, rdlength);
        }

        let Some(known) = rtype.as_known() else {
            return Err(Error::invalid_rdata(
                rtype.to_string(),
                "unknown types require the \\# generic form",
            ));
        };

        Ok(match known {
            RecordType::A => Self::A(A::parse_text(origin, tokens)?),
            RecordType::AAAA => Self::AAAA(AAAA::parse_text(origin, tokens)?),
            RecordType::NS => Self::NS(NS::parse_text(origin, tokens)?),
            RecordType::CNAME => Self::CNAME(CNAME::parse_text(origin, tokens)?),
            RecordType::PTR => Self::PTR(PTR::parse_text(origin, tokens)?),
            RecordType::DNAME => Self::DNAME(DNAME::parse_text(origin, tokens)?),
            RecordType::MX => Self::MX(MX::parse_text(origin, tokens)?),
            RecordType::SOA => Self::SOA(SOA::parse_text(origin, tokens)?),
            RecordType::TXT => Self::TXT(TXT::parse_text(origin, tokens)?),
            RecordType::HINFO => Self::HINFO(HINFO::parse_text(origin, tokens)?),
            RecordType::ISDN => Self::ISDN(ISDN::parse_text(origin, tokens)?),
            RecordType::SSHFP => Self::SSHFP(SSHFP::parse_text(origin, tokens)?),
            RecordType::OPT => Self::OPT(Opt::parse_text(origin, tokens)?),
            other => {
                return Err(Error::invalid_rdata(
                    other.name(),
                    "no text form; use the \\# generic form",
                ))
            }
        })
    }

    /// Returns the type code of this RDATA.
    pub fn record_type(&self) -> Type {
        let known = match self {
            Self::A(_) => RecordType::A,
            Self::AAAA(_) => RecordType::AAAA,
            Self::NS(_) => RecordType::NS,
            Self::CNAME(_) => RecordType::CNAME,
            Self::PTR(_) => RecordType::PTR,
            Self::DNAME(_) => RecordType::DNAME,
            Self::MX(_) => RecordType::MX,
            Self::SOA(_) => RecordType::SOA,
            Self::TXT(_) => RecordType::TXT,
            Self::HINFO(_) => RecordType::HINFO,
            Self::ISDN(_) => RecordType::ISDN,
            Self::SSHFP(_) => RecordType::SSHFP,
            Self::OPT(_) => RecordType::OPT,
            Self::Unknown(u) => return u.rtype(),
        };
        Type::Known(known)
    }

    /// Upper bound on the encoded RDATA size.
    pub fn max_encoded_len(&self) -> usize {
        dispatch!(self, r => r.max_encoded_len())
    }

    /// Appends the RDATA to `buf`.
    pub fn encode(
        &self,
        buf: &mut BytesMut,
        compression: Option<&mut CompressionTable>,
        canonical: bool,
    ) {
        dispatch!(self, r => r.encode(buf, compression, canonical));
    }

    /// Returns true for aliases that restart resolution (CNAME, DNAME).
    pub fn is_alias(&self) -> bool {
        matches!(self, Self::CNAME(_) | Self::DNAME(_))
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, r => fmt::Display::fmt(r, f))
    }
}

// =============================================================================
// Master-file token helpers
// =============================================================================

/// Fails unless `tokens.len()` lies in `min..=max`.
pub(crate) fn expect_tokens(rtype: &str, tokens: &[&str], min: usize, max: usize) -> Result<()> {
    if tokens.len() < min || tokens.len() > max {
        let expected = match (min, max) {
            (a, b) if a == b => a.to_string(),
            (a, usize::MAX) => format!("at least {a}"),
            (a, b) => format!("{a} to {b}"),
        };
        return Err(Error::token_count(rtype, expected, tokens.len()));
    }
    Ok(())
}

/// Parses a numeric or address token.
pub(crate) fn parse_token<T>(rtype: &str, token: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    token
        .parse()
        .map_err(|e: T::Err| Error::invalid_token(rtype, token, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn origin() -> Name {
        Name::from_str("example.").unwrap()
    }

    #[test]
    fn test_dispatch_by_type_code() {
        let msg = [192, 0, 2, 1];
        let rdata = RData::parse_wire(RecordType::A.into(), &msg, 0, 4).unwrap();
        assert_eq!(rdata, RData::A(A::new(Ipv4Addr::new(192, 0, 2, 1))));
        assert_eq!(rdata.record_type(), Type::Known(RecordType::A));
    }

    #[test]
    fn test_unknown_type_preserved() {
        let msg = [1, 2, 3];
        let rdata = RData::parse_wire(Type::Unknown(65280), &msg, 0, 3).unwrap();
        assert_eq!(rdata.record_type(), Type::Unknown(65280));
        assert_eq!(rdata.to_string(), "\\# 3 010203");

        let mut buf = BytesMut::new();
        rdata.encode(&mut buf, None, false);
        assert_eq!(&buf[..], &msg);
    }

    #[test]
    fn test_known_type_without_variant_is_opaque() {
        let msg = [0xAB; 8];
        let rdata = RData::parse_wire(RecordType::CAA.into(), &msg, 0, 8).unwrap();
        assert!(matches!(rdata, RData::Unknown(_)));
        assert_eq!(rdata.record_type(), Type::Known(RecordType::CAA));
    }

    #[test]
    fn test_rdlength_past_buffer() {
        let msg = [1, 2, 3];
        assert!(RData::parse_wire(RecordType::A.into(), &msg, 0, 4)
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn test_generic_text_form_for_known_type() {
        let rdata =
            RData::parse_text(RecordType::A.into(), &origin(), &["\\#", "4", "C0000201"]).unwrap();
        assert_eq!(rdata, RData::A(A::new(Ipv4Addr::new(192, 0, 2, 1))));
    }

    #[test]
    fn test_text_form_dispatch() {
        let rdata = RData::parse_text(RecordType::MX.into(), &origin(), &["10", "mail"]).unwrap();
        assert_eq!(rdata.to_string(), "10 mail.example.");

        assert!(RData::parse_text(Type::Unknown(999), &origin(), &["x"]).is_err());
        assert!(RData::parse_text(RecordType::OPT.into(), &origin(), &[]).is_err());
    }

    #[test]
    fn test_token_count_messages() {
        let err = expect_tokens("HINFO", &["a"], 2, 2).unwrap_err();
        assert_eq!(err.to_string(), "HINFO expects 2 tokens, got 1");
        let err = expect_tokens("TXT", &[], 1, usize::MAX).unwrap_err();
        assert_eq!(err.to_string(), "TXT expects at least 1 tokens, got 0");
        assert!(err.is_format_error());
    }
}
