//! # Skein DNS Client Transport
//!
//! Moves encoded DNS messages between a client and a server.
//!
//! ## Features
//!
//! - **Stream framing** with the 2-byte length prefix of RFC 1035 section 4.2.2
//! - **Pipelining**: many exchanges share one TCP connection and responses
//!   are routed by transaction id, in any order
//! - **Transport selection**: UDP first, TCP for zone transfers, oversized
//!   queries and truncated responses
//! - **Zone transfers** spanning several messages, merged into one response
//! - **Failure taxonomy** for resolver-level callers
//!
//! Connectivity problems never surface as errors. Operations return `None`
//! or `false`, mark the connection faulty, and leave failover to the caller.
//!
//! ## Example
//!
//! ```rust,ignore
//! use skein_transport::{EndpointInfo, Transport, TransportConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let transport = Transport::new(TransportConfig::default());
//! let endpoint = EndpointInfo::new("192.0.2.53".parse()?);
//! let response = transport.resolve(&endpoint, &query, &CancellationToken::new()).await?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod failure;
pub mod logging;
pub mod pipeline;
pub mod transport;

pub use config::{ConfigError, TransportConfig};
pub use connection::{Connection, StreamConnection, TcpConnection, UdpConnection};
pub use endpoint::{EndpointInfo, FramedPacket, MessageIdentification};
pub use failure::{FailureReason, ResolutionFailure};
pub use logging::{init_tracing, init_tracing_from_env, LogConfig, LogFormat, LogLevel};
pub use pipeline::{PipelinedConnection, ResponseStream};
pub use transport::Transport;
