//! # Skein DNS Wire Codec
//!
//! Binary encoding and decoding of DNS messages and resource records
//! following RFC 1035 and its extensions.
//!
//! ## Features
//!
//! - **Message codec** with header flags, the four record sections and
//!   name compression scoped to a single message
//! - **Canonical encoding** (lowercase, no compression) for DNSSEC signing input
//! - **Record data variants** keyed by the 16-bit type code, each able to parse
//!   wire bytes, parse master-file tokens, bound its encoded size, encode and
//!   render itself as text
//! - **EDNS(0)** (RFC 6891) through the OPT pseudo-record
//! - **Opaque fallback** for unknown record types (RFC 3597)
//!
//! ## Example
//!
//! ```rust,ignore
//! use skein_proto::{Message, Question, Name, RecordType, RecordClass};
//!
//! let query = Message::query(Question::new(
//!     Name::from_str("example.com.")?,
//!     RecordType::A,
//!     RecordClass::IN,
//! ));
//!
//! let wire = query.to_wire()?;
//! let parsed = Message::parse(&wire)?;
//! assert_eq!(parsed.id(), query.id());
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod class;
pub mod edns;
pub mod error;
pub mod header;
pub mod message;
pub mod name;
pub mod opcode;
pub mod question;
pub mod rcode;
pub mod rdata;
pub mod record;
pub mod rtype;
pub mod wire;

pub use class::{Class, RecordClass};
pub use edns::{Edns, EdnsOption, EdnsOptionCode};
pub use error::{Error, Result};
pub use header::{Header, HeaderFlags};
pub use message::Message;
pub use name::{CompressionTable, Name};
pub use opcode::OpCode;
pub use question::Question;
pub use rcode::ResponseCode;
pub use rdata::{RData, RecordData};
pub use record::ResourceRecord;
pub use rtype::{RecordType, Type};

/// Maximum length of a DNS label (63 bytes per RFC 1035)
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a domain name (255 bytes per RFC 1035)
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum size of a UDP DNS message without EDNS0 (512 bytes per RFC 1035)
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;

/// Default EDNS0 UDP payload size
pub const DEFAULT_EDNS_UDP_SIZE: u16 = 4096;

/// Largest message a stream transport can frame (2-byte length prefix)
pub const MAX_STREAM_MESSAGE_SIZE: usize = 65535;

/// Largest offset a compression pointer can address (14 bits)
pub const MAX_COMPRESSION_OFFSET: usize = 0x3FFF;

/// DNS port (53)
pub const DNS_PORT: u16 = 53;
