//! Endpoints, framed packets and transaction identification.

use bytes::Bytes;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// One candidate path to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointInfo {
    /// Whether the server address is a multicast group.
    pub is_multicast: bool,

    /// Address of the server.
    pub server_address: IpAddr,

    /// Local address to bind to, if any.
    pub local_address: Option<IpAddr>,
}

impl EndpointInfo {
    /// Creates a unicast endpoint with no local bind.
    pub fn new(server_address: IpAddr) -> Self {
        Self {
            is_multicast: server_address.is_multicast(),
            server_address,
            local_address: None,
        }
    }

    /// Sets the local bind address.
    #[must_use]
    pub fn with_local_address(mut self, local: IpAddr) -> Self {
        self.local_address = Some(local);
        self
    }

    /// Identification expected on the response to a request with `id`.
    ///
    /// Multicast responses may come from any member, so only the id counts.
    pub fn identification(&self, id: u16) -> MessageIdentification {
        MessageIdentification {
            id,
            remote: (!self.is_multicast).then_some(self.server_address),
        }
    }
}

impl fmt::Display for EndpointInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local_address {
            Some(local) => write!(f, "{} (via {local})", self.server_address),
            None => write!(f, "{}", self.server_address),
        }
    }
}

/// Correlates a response with the request that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageIdentification {
    /// Transaction id.
    pub id: u16,

    /// Remote address, or `None` when any sender is acceptable.
    pub remote: Option<IpAddr>,
}

impl MessageIdentification {
    /// Returns true if `other` identifies the same exchange.
    pub fn matches(&self, other: &Self) -> bool {
        if self.id != other.id {
            return false;
        }
        match (self.remote, other.remote) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

/// One complete DNS message as received from a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedPacket {
    /// Message bytes without any stream length prefix.
    pub data: Bytes,

    /// The peer the frame came from.
    pub destination: SocketAddr,

    /// The local end of the connection.
    pub local: SocketAddr,
}

impl FramedPacket {
    /// Creates a packet.
    pub fn new(data: Bytes, destination: SocketAddr, local: SocketAddr) -> Self {
        Self {
            data,
            destination,
            local,
        }
    }

    /// Returns the transaction id, or `None` if the frame is shorter than one.
    pub fn id(&self) -> Option<u16> {
        match self.data.as_ref() {
            [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }

    /// Returns the identification of this frame.
    pub fn identification(&self) -> Option<MessageIdentification> {
        self.id().map(|id| MessageIdentification {
            id,
            remote: Some(self.destination.ip()),
        })
    }

    /// Returns the message length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true for an empty frame.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
