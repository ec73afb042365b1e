//! Datagram connections.

use super::Connection;
use crate::endpoint::{EndpointInfo, FramedPacket};
use async_trait::async_trait;
use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Largest payload a UDP datagram can carry.
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// A UDP socket used for one exchange with one server.
///
/// Every datagram is a complete message, so there is no framing.
#[derive(Debug)]
pub struct UdpConnection {
    socket: UdpSocket,
    remote: SocketAddr,
    local: SocketAddr,
    io_timeout: Duration,
    max_message_size: usize,
    is_multicast: bool,
    faulty: AtomicBool,
}

impl UdpConnection {
    /// Opens a socket towards `endpoint` on `port`.
    ///
    /// Unicast sockets are connected so the kernel drops datagrams from
    /// other sources. `max_message_size` bounds outgoing queries; larger
    /// responses are still received whole.
    pub async fn connect(
        endpoint: &EndpointInfo,
        port: u16,
        timeout: Duration,
        max_message_size: usize,
    ) -> Option<Self> {
        let remote = SocketAddr::new(endpoint.server_address, port);

        let socket = match udp_socket(endpoint, remote) {
            Ok(socket) => socket,
            Err(e) => {
                debug!(server = %remote, error = %e, "Failed to create UDP socket");
                return None;
            }
        };

        if !endpoint.is_multicast {
            if let Err(e) = socket.connect(remote).await {
                debug!(server = %remote, error = %e, "UDP connect failed");
                return None;
            }
        }

        let local = socket.local_addr().ok()?;
        Some(Self {
            socket,
            remote,
            local,
            io_timeout: timeout,
            max_message_size,
            is_multicast: endpoint.is_multicast,
            faulty: AtomicBool::new(false),
        })
    }
}

fn udp_socket(endpoint: &EndpointInfo, remote: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(remote), Type::DGRAM, Some(Protocol::UDP))?;

    let local = endpoint.local_address.unwrap_or(match remote {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    });
    socket.bind(&SocketAddr::new(local, 0).into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

#[async_trait]
impl Connection for UdpConnection {
    async fn send(&self, message: &[u8], cancel: &CancellationToken) -> bool {
        if self.is_faulty() || message.len() > self.max_message_size {
            return false;
        }

        let send = async {
            if self.is_multicast {
                self.socket.send_to(message, self.remote).await
            } else {
                self.socket.send(message).await
            }
        };
        let sent = tokio::select! {
            () = cancel.cancelled() => None,
            res = tokio::time::timeout(self.io_timeout, send) => res.ok(),
        };

        match sent {
            Some(Ok(_)) => {
                trace!(server = %self.remote, size = message.len(), "Sent datagram");
                true
            }
            other => {
                debug!(server = %self.remote, result = ?other, "Datagram send failed");
                self.mark_faulty();
                false
            }
        }
    }

    async fn receive(&self, cancel: &CancellationToken) -> Option<FramedPacket> {
        if self.is_faulty() {
            return None;
        }

        // Sized for any datagram so the kernel never cuts a response short.
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let received = tokio::select! {
            () = cancel.cancelled() => None,
            res = tokio::time::timeout(self.io_timeout, self.socket.recv_from(&mut buf)) => res.ok(),
        };

        match received {
            Some(Ok((len, from))) => {
                buf.truncate(len);
                if len > self.max_message_size {
                    debug!(
                        server = %from,
                        size = len,
                        max = self.max_message_size,
                        "Datagram exceeds advertised payload size"
                    );
                }
                trace!(server = %from, size = len, "Received datagram");
                Some(FramedPacket::new(Bytes::from(buf), from, self.local))
            }
            other => {
                debug!(server = %self.remote, result = ?other.map(|r| r.map(|(n, _)| n)), "Datagram receive failed");
                self.mark_faulty();
                None
            }
        }
    }

    fn is_alive(&self) -> bool {
        !self.is_faulty()
    }

    fn is_faulty(&self) -> bool {
        self.faulty.load(Ordering::Acquire)
    }

    fn mark_faulty(&self) {
        self.faulty.store(true, Ordering::Release);
    }

    async fn close(&self) {
        self.mark_faulty();
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}
