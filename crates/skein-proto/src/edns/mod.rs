//! EDNS(0) support (RFC 6891).
//!
//! The OPT pseudo-record rides in the additional section. Its CLASS field
//! carries the requestor's UDP payload size and its TTL packs the extended
//! RCODE, the EDNS version and the flags:
//!
//! ```text
//! +------------------+-----------------+----+--------------+
//! | EXTENDED-RCODE 8 |   VERSION 8     | DO |    Z 15      |
//! +------------------+-----------------+----+--------------+
//! ```
//!
//! [`Opt`] is the RDATA (the option list); [`Edns`] is the decoded view that
//! [`crate::Message`] exposes instead of the raw record.

use crate::class::Class;
use crate::error::{Error, Result};
use crate::name::{CompressionTable, Name};
use crate::rdata::{RData, RecordData};
use crate::record::ResourceRecord;
use crate::rtype::{RecordType, Type};
use crate::wire::{rdata_end, WireReader};
use bytes::{BufMut, BytesMut};
use data_encoding::HEXLOWER;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// DO bit inside the OPT TTL flags.
const DNSSEC_OK_FLAG: u32 = 0x8000;

/// EDNS option codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u16)]
pub enum EdnsOptionCode {
    /// Long-Lived Queries (RFC 8764)
    Llq = 1,
    /// Update Lease
    Ul = 2,
    /// Name Server Identifier (RFC 5001)
    Nsid = 3,
    /// EDNS0 Owner
    Owner = 4,
    /// DNSSEC Algorithm Understood (RFC 6975)
    Dau = 5,
    /// DS Hash Understood (RFC 6975)
    Dhu = 6,
    /// NSEC3 Hash Understood (RFC 6975)
    N3u = 7,
    /// Client Subnet (RFC 7871)
    ClientSubnet = 8,
    /// EDNS Expire (RFC 7314)
    Expire = 9,
    /// DNS Cookie (RFC 7873)
    Cookie = 10,
    /// TCP Keepalive (RFC 7828)
    TcpKeepalive = 11,
    /// Padding (RFC 7830)
    Padding = 12,
}

impl EdnsOptionCode {
    /// Creates from u16 value.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }
}

/// EDNS option value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdnsOption {
    /// Name Server Identifier.
    Nsid(Vec<u8>),

    /// Client subnet information.
    ClientSubnet {
        /// Address family (1=IPv4, 2=IPv6).
        family: u16,
        /// Source prefix length.
        source_prefix: u8,
        /// Scope prefix length.
        scope_prefix: u8,
        /// Address bytes, truncated to the source prefix.
        address: Vec<u8>,
    },

    /// DNS Cookie.
    Cookie {
        /// Client cookie (8 bytes).
        client: [u8; 8],
        /// Server cookie (8-32 bytes, optional).
        server: Option<Vec<u8>>,
    },

    /// TCP Keepalive timeout in units of 100 ms.
    TcpKeepalive(Option<u16>),

    /// Padding bytes.
    Padding(Vec<u8>),

    /// EDNS Expire timer.
    Expire(Option<u32>),

    /// Any other option, kept opaque.
    Unknown {
        /// Option code.
        code: u16,
        /// Option data.
        data: Vec<u8>,
    },
}

impl EdnsOption {
    /// Returns the option code.
    pub fn code(&self) -> u16 {
        let code = match self {
            Self::Nsid(_) => EdnsOptionCode::Nsid,
            Self::ClientSubnet { .. } => EdnsOptionCode::ClientSubnet,
            Self::Cookie { .. } => EdnsOptionCode::Cookie,
            Self::TcpKeepalive(_) => EdnsOptionCode::TcpKeepalive,
            Self::Padding(_) => EdnsOptionCode::Padding,
            Self::Expire(_) => EdnsOptionCode::Expire,
            Self::Unknown { code, .. } => return *code,
        };
        code.into()
    }

    fn data_len(&self) -> usize {
        match self {
            Self::Nsid(data) | Self::Padding(data) | Self::Unknown { data, .. } => data.len(),
            Self::ClientSubnet { address, .. } => 4 + address.len(),
            Self::Cookie { server, .. } => 8 + server.as_ref().map_or(0, Vec::len),
            Self::TcpKeepalive(timeout) => timeout.map_or(0, |_| 2),
            Self::Expire(value) => value.map_or(0, |_| 4),
        }
    }

    /// Returns the wire format length including the code and length fields.
    #[inline]
    pub fn wire_len(&self) -> usize {
        4 + self.data_len()
    }

    /// Writes the option to wire format.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.code());
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u16(self.data_len() as u16);

        match self {
            Self::Nsid(data) | Self::Padding(data) | Self::Unknown { data, .. } => {
                buf.put_slice(data);
            }
            Self::ClientSubnet {
                family,
                source_prefix,
                scope_prefix,
                address,
            } => {
                buf.put_u16(*family);
                buf.put_u8(*source_prefix);
                buf.put_u8(*scope_prefix);
                buf.put_slice(address);
            }
            Self::Cookie { client, server } => {
                buf.put_slice(client);
                if let Some(server) = server {
                    buf.put_slice(server);
                }
            }
            Self::TcpKeepalive(timeout) => {
                if let Some(t) = timeout {
                    buf.put_u16(*t);
                }
            }
            Self::Expire(value) => {
                if let Some(v) = value {
                    buf.put_u32(*v);
                }
            }
        }
    }

    /// Parses one option at the reader's position.
    pub fn parse(reader: &mut WireReader<'_>) -> Result<Self> {
        let code = reader.read_u16()?;
        let length = reader.read_u16()? as usize;
        let data = reader.read_bytes(length)?;

        let option = match EdnsOptionCode::from_u16(code) {
            Some(EdnsOptionCode::Nsid) => Self::Nsid(data.to_vec()),
            Some(EdnsOptionCode::ClientSubnet) => {
                if length < 4 {
                    return Err(Error::invalid_edns_option(code, "client subnet shorter than 4 bytes"));
                }
                Self::ClientSubnet {
                    family: u16::from_be_bytes([data[0], data[1]]),
                    source_prefix: data[2],
                    scope_prefix: data[3],
                    address: data[4..].to_vec(),
                }
            }
            Some(EdnsOptionCode::Cookie) => {
                if length != 8 && !(16..=40).contains(&length) {
                    return Err(Error::invalid_edns_option(
                        code,
                        format!("cookie of {length} bytes"),
                    ));
                }
                let mut client = [0u8; 8];
                client.copy_from_slice(&data[..8]);
                let server = (length > 8).then(|| data[8..].to_vec());
                Self::Cookie { client, server }
            }
            Some(EdnsOptionCode::TcpKeepalive) => match data {
                [] => Self::TcpKeepalive(None),
                [a, b] => Self::TcpKeepalive(Some(u16::from_be_bytes([*a, *b]))),
                _ => {
                    return Err(Error::invalid_edns_option(
                        code,
                        format!("keepalive of {length} bytes"),
                    ))
                }
            },
            Some(EdnsOptionCode::Padding) => Self::Padding(data.to_vec()),
            Some(EdnsOptionCode::Expire) => match data {
                [] => Self::Expire(None),
                [a, b, c, d] => Self::Expire(Some(u32::from_be_bytes([*a, *b, *c, *d]))),
                _ => {
                    return Err(Error::invalid_edns_option(
                        code,
                        format!("expire of {length} bytes"),
                    ))
                }
            },
            _ => Self::Unknown {
                code,
                data: data.to_vec(),
            },
        };

        Ok(option)
    }
}

impl fmt::Display for EdnsOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nsid(data) => write!(f, "NSID: {}", HEXLOWER.encode(data)),
            Self::ClientSubnet {
                family,
                source_prefix,
                scope_prefix,
                address,
            } => {
                let addr = match *family {
                    1 => {
                        let mut octets = [0u8; 4];
                        let n = address.len().min(4);
                        octets[..n].copy_from_slice(&address[..n]);
                        Ipv4Addr::from(octets).to_string()
                    }
                    2 => {
                        let mut octets = [0u8; 16];
                        let n = address.len().min(16);
                        octets[..n].copy_from_slice(&address[..n]);
                        Ipv6Addr::from(octets).to_string()
                    }
                    _ => HEXLOWER.encode(address),
                };
                write!(f, "CLIENT-SUBNET: {addr}/{source_prefix}/{scope_prefix}")
            }
            Self::Cookie { client, server } => {
                write!(f, "COOKIE: {}", HEXLOWER.encode(client))?;
                if let Some(server) = server {
                    write!(f, "{}", HEXLOWER.encode(server))?;
                }
                Ok(())
            }
            Self::TcpKeepalive(Some(t)) => write!(f, "TCP-KEEPALIVE: {t}"),
            Self::TcpKeepalive(None) => f.write_str("TCP-KEEPALIVE"),
            Self::Padding(data) => write!(f, "PADDING: {} bytes", data.len()),
            Self::Expire(Some(v)) => write!(f, "EXPIRE: {v}"),
            Self::Expire(None) => f.write_str("EXPIRE"),
            Self::Unknown { code, data } => {
                write!(f, "OPT{code}: {}", HEXLOWER.encode(data))
            }
        }
    }
}

/// OPT pseudo-record data: the EDNS option list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opt {
    options: SmallVec<[EdnsOption; 2]>,
}

impl Opt {
    /// Creates an option list.
    pub fn new(options: impl IntoIterator<Item = EdnsOption>) -> Self {
        Self {
            options: options.into_iter().collect(),
        }
    }

    /// Returns the options in wire order.
    #[inline]
    pub fn options(&self) -> &[EdnsOption] {
        &self.options
    }

    /// Exact encoded size of the option list.
    pub fn max_encoded_len(&self) -> usize {
        self.options.iter().map(EdnsOption::wire_len).sum()
    }

    /// Appends every option.
    pub fn encode(&self, buf: &mut BytesMut, _: Option<&mut CompressionTable>, _: bool) {
        for option in &self.options {
            option.write_to(buf);
        }
    }
}

impl RecordData for Opt {
    fn parse_wire(message: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let end = rdata_end(message, offset, rdlength)?;
        let mut reader = WireReader::at(&message[..end], offset);
        let mut options = SmallVec::new();
        while reader.position() < end {
            options.push(EdnsOption::parse(&mut reader)?);
        }
        Ok(Self { options })
    }

    fn parse_text(_origin: &Name, _tokens: &[&str]) -> Result<Self> {
        Err(Error::invalid_rdata("OPT", "pseudo-record has no master-file form"))
    }

    fn max_encoded_len(&self) -> usize {
        Opt::max_encoded_len(self)
    }

    fn encode(&self, buf: &mut BytesMut, compression: Option<&mut CompressionTable>, canonical: bool) {
        Opt::encode(self, buf, compression, canonical);
    }
}

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, option) in self.options.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{option}")?;
        }
        Ok(())
    }
}

/// Decoded EDNS state of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edns {
    udp_size: u16,
    extended_rcode: u8,
    version: u8,
    dnssec_ok: bool,
    opt: Opt,
}

impl Default for Edns {
    fn default() -> Self {
        Self::new()
    }
}

impl Edns {
    /// Default UDP payload size for EDNS.
    pub const DEFAULT_UDP_SIZE: u16 = crate::DEFAULT_EDNS_UDP_SIZE;

    /// Creates version 0 EDNS with the default payload size.
    pub fn new() -> Self {
        Self {
            udp_size: Self::DEFAULT_UDP_SIZE,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
            opt: Opt::default(),
        }
    }

    /// Returns the EDNS version.
    #[inline]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Sets the EDNS version.
    pub fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    /// Returns the advertised UDP payload size.
    #[inline]
    pub const fn udp_size(&self) -> u16 {
        self.udp_size
    }

    /// Sets the UDP payload size.
    pub fn set_udp_size(&mut self, size: u16) {
        self.udp_size = size;
    }

    /// Returns the upper 8 bits of the response code.
    #[inline]
    pub const fn extended_rcode(&self) -> u8 {
        self.extended_rcode
    }

    /// Sets the upper 8 bits of the response code.
    pub fn set_extended_rcode(&mut self, rcode: u8) {
        self.extended_rcode = rcode;
    }

    /// Returns true if the DNSSEC OK flag is set.
    #[inline]
    pub const fn dnssec_ok(&self) -> bool {
        self.dnssec_ok
    }

    /// Sets the DNSSEC OK flag.
    pub fn set_dnssec_ok(&mut self, ok: bool) {
        self.dnssec_ok = ok;
    }

    /// Returns the EDNS options.
    #[inline]
    pub fn options(&self) -> &[EdnsOption] {
        self.opt.options()
    }

    /// Adds an option.
    pub fn add_option(&mut self, option: EdnsOption) {
        self.opt.options.push(option);
    }

    /// Returns the NSID payload if present.
    pub fn nsid(&self) -> Option<&[u8]> {
        self.options().iter().find_map(|o| match o {
            EdnsOption::Nsid(data) => Some(data.as_slice()),
            _ => None,
        })
    }

    /// Returns the client cookie if present.
    pub fn cookie(&self) -> Option<&[u8; 8]> {
        self.options().iter().find_map(|o| match o {
            EdnsOption::Cookie { client, .. } => Some(client),
            _ => None,
        })
    }

    /// Packs the extended RCODE, version and flags into the OPT TTL.
    pub fn ttl(&self) -> u32 {
        let flags = if self.dnssec_ok { DNSSEC_OK_FLAG } else { 0 };
        (u32::from(self.extended_rcode) << 24) | (u32::from(self.version) << 16) | flags
    }

    /// Decodes an OPT record. Versions other than 0 are carried as-is.
    pub fn from_record(record: &ResourceRecord) -> Result<Self> {
        let RData::OPT(opt) = record.rdata() else {
            return Err(Error::invalid_rdata(
                record.rtype().to_string(),
                "not an OPT record",
            ));
        };
        let ttl = record.ttl();
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self {
            udp_size: record.rclass().to_u16(),
            extended_rcode: (ttl >> 24) as u8,
            version: (ttl >> 16) as u8,
            dnssec_ok: ttl & DNSSEC_OK_FLAG != 0,
            opt: opt.clone(),
        })
    }

    /// Builds the OPT pseudo-record for the additional section.
    pub fn to_record(&self) -> ResourceRecord {
        ResourceRecord::new(
            Name::root(),
            Type::Known(RecordType::OPT),
            Class::from_u16(self.udp_size),
            self.ttl(),
            RData::OPT(self.opt.clone()),
        )
    }

    /// Returns the full wire length of the OPT pseudo-record.
    pub fn wire_len(&self) -> usize {
        // root (1) + TYPE (2) + CLASS (2) + TTL (4) + RDLENGTH (2)
        11 + self.opt.max_encoded_len()
    }
}

impl fmt::Display for Edns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EDNS: version: {}, flags:", self.version)?;
        if self.dnssec_ok {
            f.write_str(" do")?;
        }
        write!(f, "; udp: {}", self.udp_size)?;
        for option in self.options() {
            write!(f, "\n; {option}")?;
        }
        Ok(())
    }
}
