//! Connections to a single server.
//!
//! Connectivity faults never surface as errors. Every operation reports
//! failure through its return value (`false` or `None`) and marks the
//! connection faulty, after which it is never used again. Callers move on to
//! the next address or transport.

mod stream;
mod udp;

pub use stream::{StreamConnection, TcpConnection};
pub use udp::UdpConnection;

use crate::endpoint::{FramedPacket, MessageIdentification};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A connection able to exchange whole DNS messages.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Sends one message. Returns `false` on any failure.
    async fn send(&self, message: &[u8], cancel: &CancellationToken) -> bool;

    /// Receives the next complete message.
    async fn receive(&self, cancel: &CancellationToken) -> Option<FramedPacket>;

    /// Receives frames until one matches `expected`.
    ///
    /// Frames for other exchanges are dropped. Returns `None` once the
    /// connection stops yielding frames.
    async fn receive_matching(
        &self,
        expected: &MessageIdentification,
        cancel: &CancellationToken,
    ) -> Option<FramedPacket> {
        while let Some(packet) = self.receive(cancel).await {
            match packet.identification() {
                Some(id) if expected.matches(&id) => return Some(packet),
                other => trace!(
                    expected = expected.id,
                    received = ?other.map(|i| i.id),
                    "Discarding non-matching frame"
                ),
            }
        }
        None
    }

    /// Waits, without a timeout, until a frame starts arriving.
    ///
    /// Returns `false` once the peer has closed the connection or `cancel`
    /// fires. Nothing is consumed.
    async fn wait_readable(&self, _cancel: &CancellationToken) -> bool {
        !self.is_faulty()
    }

    /// Returns true while the connection can still be used.
    fn is_alive(&self) -> bool;

    /// Returns true once a fault was recorded.
    fn is_faulty(&self) -> bool;

    /// Records a fault. Faults are permanent.
    fn mark_faulty(&self);

    /// Resets the idle timer. Plain sockets have none.
    fn restart_idle_timeout(&self, _timeout: Option<Duration>) {}

    /// Releases the socket. The connection is marked faulty first.
    async fn close(&self);

    /// Address of the server.
    fn remote_addr(&self) -> SocketAddr;

    /// Local address of the socket.
    fn local_addr(&self) -> SocketAddr;

    /// Largest message `send` accepts.
    fn max_message_size(&self) -> usize;
}
