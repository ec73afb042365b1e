//! Pipelined use of one stream connection by many concurrent exchanges.
//!
//! A single reader task owns the receive side and routes every frame to the
//! exchange waiting on its transaction id. Responses may arrive in any
//! order. Frames nobody waits for are dropped.

use crate::connection::Connection;
use crate::endpoint::{FramedPacket, MessageIdentification};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default cap on exchanges in flight on one connection.
pub const DEFAULT_MAX_PIPELINED_QUERIES: usize = 64;

#[derive(Debug, Default)]
struct IdleTimer {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

struct Shared {
    connection: Arc<dyn Connection>,
    pending: Mutex<HashMap<u16, mpsc::UnboundedSender<FramedPacket>>>,
    max_pending: usize,
    response_timeout: Duration,
    idle: Mutex<IdleTimer>,
    idle_changed: Notify,
    shutdown: CancellationToken,
}

impl Shared {
    fn deregister(&self, id: u16) {
        let now_idle = {
            let mut pending = self.pending.lock();
            pending.remove(&id);
            pending.is_empty()
        };
        if now_idle {
            self.rearm_idle_timer();
        }
    }

    fn rearm_idle_timer(&self) {
        {
            let mut idle = self.idle.lock();
            idle.deadline = idle.timeout.map(|t| Instant::now() + t);
        }
        self.idle_changed.notify_one();
    }

    fn route(&self, packet: FramedPacket) {
        let Some(id) = packet.id() else {
            warn!(server = %packet.destination, "Discarding frame without header");
            return;
        };

        let pending = self.pending.lock();
        match pending.get(&id) {
            Some(tx) => {
                trace!(server = %packet.destination, id, "Routing frame");
                // The receiver may have gone away since the lookup.
                let _ = tx.send(packet);
            }
            None => warn!(server = %packet.destination, id, "Discarding unexpected frame"),
        }
    }
}

/// A connection shared by concurrent exchanges.
///
/// Must be created inside a Tokio runtime; it spawns a reader task and an
/// idle watchdog. Both stop when the connection is closed or dropped.
pub struct PipelinedConnection {
    shared: Arc<Shared>,
}

impl PipelinedConnection {
    /// Wraps `connection`.
    ///
    /// An exchange waiting longer than `response_timeout` for its next frame
    /// tears the connection down. With an `idle_timeout` the connection is
    /// also torn down once that long passes without any exchange in flight.
    pub fn new(
        connection: Arc<dyn Connection>,
        max_pending: usize,
        response_timeout: Duration,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let shared = Arc::new(Shared {
            connection,
            pending: Mutex::new(HashMap::new()),
            max_pending: max_pending.max(1),
            response_timeout,
            idle: Mutex::new(IdleTimer {
                timeout: idle_timeout,
                deadline: idle_timeout.map(|t| Instant::now() + t),
            }),
            idle_changed: Notify::new(),
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(read_loop(Arc::clone(&shared)));
        tokio::spawn(idle_watchdog(Arc::clone(&shared)));

        Self { shared }
    }

    /// Sends `message` and returns a stream of the frames answering it.
    ///
    /// `expected` must carry the message's transaction id. Returns `None`
    /// if the connection is dead, the id is already in flight, too many
    /// exchanges are pending, or the send fails.
    pub async fn exchange(
        &self,
        message: &[u8],
        expected: MessageIdentification,
        cancel: &CancellationToken,
    ) -> Option<ResponseStream> {
        if !self.is_alive() {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut pending = self.shared.pending.lock();
            if pending.len() >= self.shared.max_pending {
                debug!(
                    server = %self.remote_addr(),
                    pending = pending.len(),
                    "Pipeline full"
                );
                return None;
            }
            if pending.contains_key(&expected.id) {
                debug!(server = %self.remote_addr(), id = expected.id, "Transaction id already in flight");
                return None;
            }
            pending.insert(expected.id, tx);
        }

        let stream = ResponseStream {
            expected,
            rx,
            shared: Arc::clone(&self.shared),
        };

        if !self.shared.connection.send(message, cancel).await {
            return None;
        }
        Some(stream)
    }

    /// Returns true while new exchanges can be started.
    pub fn is_alive(&self) -> bool {
        !self.shared.shutdown.is_cancelled() && self.shared.connection.is_alive()
    }

    /// Returns the number of exchanges in flight.
    pub fn pending(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Restarts the idle timer with `timeout`; `None` disables it.
    pub fn restart_idle_timeout(&self, timeout: Option<Duration>) {
        self.shared.idle.lock().timeout = timeout;
        self.shared.rearm_idle_timer();
    }

    /// Address of the server.
    pub fn remote_addr(&self) -> std::net::SocketAddr {
        self.shared.connection.remote_addr()
    }

    /// Largest message the underlying connection accepts.
    pub fn max_message_size(&self) -> usize {
        self.shared.connection.max_message_size()
    }

    /// Tears the connection down. Waiting exchanges see the end of their
    /// stream.
    pub fn close(&self) {
        self.shared.shutdown.cancel();
    }
}

impl Drop for PipelinedConnection {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl std::fmt::Debug for PipelinedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelinedConnection")
            .field("remote", &self.remote_addr())
            .field("pending", &self.pending())
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Frames answering one exchange.
///
/// Dropping the stream deregisters the exchange.
#[derive(Debug)]
pub struct ResponseStream {
    expected: MessageIdentification,
    rx: mpsc::UnboundedReceiver<FramedPacket>,
    shared: Arc<Shared>,
}

impl ResponseStream {
    /// Waits for the next frame of this exchange.
    ///
    /// Returns `None` when cancelled, on timeout, or once the connection has
    /// gone away. A timeout closes the connection. Cancellation only ends this
    /// exchange; the connection and the other exchanges on it stay up, and a
    /// late answer to this id is discarded once the stream is dropped.
    pub async fn next(&mut self, cancel: &CancellationToken) -> Option<FramedPacket> {
        loop {
            let received = tokio::select! {
                () = cancel.cancelled() => return None,
                res = tokio::time::timeout(self.shared.response_timeout, self.rx.recv()) => res,
            };
            let Ok(packet) = received else {
                debug!(
                    server = %self.shared.connection.remote_addr(),
                    id = self.expected.id,
                    "Response timed out"
                );
                self.shared.connection.mark_faulty();
                self.shared.shutdown.cancel();
                return None;
            };
            let packet = packet?;
            match packet.identification() {
                Some(id) if self.expected.matches(&id) => return Some(packet),
                _ => warn!(server = %packet.destination, id = self.expected.id, "Discarding frame from unexpected peer"),
            }
        }
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        self.shared.deregister(self.expected.id);
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("remote", &self.connection.remote_addr())
            .finish_non_exhaustive()
    }
}

async fn read_loop(shared: Arc<Shared>) {
    loop {
        // Untimed and also armed while nothing is pending, so a peer that
        // closes an idle connection marks it faulty before it is reused.
        if !shared.connection.wait_readable(&shared.shutdown).await {
            break;
        }

        match shared.connection.receive(&shared.shutdown).await {
            Some(packet) => shared.route(packet),
            None => break,
        }
    }

    shared.shutdown.cancel();
    shared.connection.close().await;
    // Dropping the senders ends every waiting stream.
    let abandoned = std::mem::take(&mut *shared.pending.lock());
    debug!(
        server = %shared.connection.remote_addr(),
        abandoned = abandoned.len(),
        "Pipelined connection closed"
    );
}

async fn idle_watchdog(shared: Arc<Shared>) {
    loop {
        let deadline = shared.idle.lock().deadline;
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    () = shared.shutdown.cancelled() => return,
                    () = shared.idle_changed.notified() => continue,
                    () = tokio::time::sleep_until(deadline) => {}
                }
                let still_due = shared.idle.lock().deadline.is_some_and(|d| d <= Instant::now());
                if still_due && shared.pending.lock().is_empty() {
                    debug!(server = %shared.connection.remote_addr(), "Idle timeout elapsed");
                    shared.shutdown.cancel();
                    return;
                }
                if still_due {
                    // Busy at the deadline; wait for the last exchange to finish.
                    tokio::select! {
                        () = shared.shutdown.cancelled() => return,
                        () = shared.idle_changed.notified() => {}
                    }
                }
            }
            None => {
                tokio::select! {
                    () = shared.shutdown.cancelled() => return,
                    () = shared.idle_changed.notified() => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::StreamConnection;
    use std::net::SocketAddr;
    use tokio::io::{duplex, split, AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn expected(id: u16) -> MessageIdentification {
        MessageIdentification {
            id,
            remote: Some(addr(53).ip()),
        }
    }

    fn pipelined(max_pending: usize, idle: Option<Duration>) -> (PipelinedConnection, DuplexStream) {
        let (ours, theirs) = duplex(8192);
        let (reader, writer) = split(ours);
        let conn = StreamConnection::from_parts(
            reader,
            writer,
            addr(53),
            addr(40000),
            Duration::from_secs(2),
        );
        (
            PipelinedConnection::new(Arc::new(conn), max_pending, Duration::from_millis(500), idle),
            theirs,
        )
    }

    async fn read_frame(peer: &mut DuplexStream) -> Vec<u8> {
        let len = peer.read_u16().await.unwrap() as usize;
        let mut buf = vec![0u8; len];
        peer.read_exact(&mut buf).await.unwrap();
        buf
    }

    async fn write_frame(peer: &mut DuplexStream, data: &[u8]) {
        peer.write_u16(data.len() as u16).await.unwrap();
        peer.write_all(data).await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let (conn, mut peer) = pipelined(8, None);
        let cancel = CancellationToken::new();

        let mut first = conn.exchange(&[0, 1, 0, 0], expected(1), &cancel).await.unwrap();
        let mut second = conn.exchange(&[0, 2, 0, 0], expected(2), &cancel).await.unwrap();
        assert_eq!(conn.pending(), 2);

        assert_eq!(read_frame(&mut peer).await, [0, 1, 0, 0]);
        assert_eq!(read_frame(&mut peer).await, [0, 2, 0, 0]);

        write_frame(&mut peer, &[0, 2, 0x80, 0]).await;
        write_frame(&mut peer, &[0, 9, 0x80, 0]).await;
        write_frame(&mut peer, &[0, 1, 0x80, 0]).await;

        let r2 = second.next(&cancel).await.unwrap();
        let r1 = first.next(&cancel).await.unwrap();
        assert_eq!(r1.id(), Some(1));
        assert_eq!(r2.id(), Some(2));

        drop(first);
        drop(second);
        assert_eq!(conn.pending(), 0);
        assert!(conn.is_alive());
    }

    #[tokio::test]
    async fn test_pipeline_cap() {
        let (conn, _peer) = pipelined(1, None);
        let cancel = CancellationToken::new();

        let held = conn.exchange(&[0, 1, 0, 0], expected(1), &cancel).await;
        assert!(held.is_some());
        assert!(conn.exchange(&[0, 2, 0, 0], expected(2), &cancel).await.is_none());

        drop(held);
        assert!(conn.exchange(&[0, 3, 0, 0], expected(3), &cancel).await.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let (conn, _peer) = pipelined(8, None);
        let cancel = CancellationToken::new();

        let _held = conn.exchange(&[0, 5, 0, 0], expected(5), &cancel).await.unwrap();
        assert!(conn.exchange(&[0, 5, 0, 0], expected(5), &cancel).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_timeout_closes_connection() {
        let (conn, _peer) = pipelined(8, None);
        assert!(conn.is_alive());

        conn.restart_idle_timeout(Some(Duration::from_millis(50)));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!conn.is_alive());
    }

    #[tokio::test]
    async fn test_idle_connection_survives_io_timeout() {
        let (conn, mut peer) = pipelined(8, None);
        let cancel = CancellationToken::new();

        let mut stream = conn.exchange(&[0, 1, 0, 0], expected(1), &cancel).await.unwrap();
        read_frame(&mut peer).await;
        write_frame(&mut peer, &[0, 1, 0x80, 0]).await;
        assert!(stream.next(&cancel).await.is_some());
        drop(stream);

        // Longer than the 2 s read timeout of the underlying connection.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(conn.is_alive());
        assert!(conn.exchange(&[0, 2, 0, 0], expected(2), &cancel).await.is_some());
    }

    #[tokio::test]
    async fn test_peer_close_while_idle() {
        let (conn, mut peer) = pipelined(8, None);
        let cancel = CancellationToken::new();

        let mut stream = conn.exchange(&[0, 1, 0, 0], expected(1), &cancel).await.unwrap();
        read_frame(&mut peer).await;
        write_frame(&mut peer, &[0, 1, 0x80, 0]).await;
        assert!(stream.next(&cancel).await.is_some());
        drop(stream);
        assert_eq!(conn.pending(), 0);

        drop(peer);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!conn.is_alive());
        assert!(conn.exchange(&[0, 2, 0, 0], expected(2), &cancel).await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_exchange_keeps_connection() {
        let (conn, mut peer) = pipelined(8, None);
        let cancel = CancellationToken::new();

        let mut other = conn.exchange(&[0, 2, 0, 0], expected(2), &cancel).await.unwrap();
        let cancelled = CancellationToken::new();
        let mut stream = conn.exchange(&[0, 1, 0, 0], expected(1), &cancelled).await.unwrap();
        cancelled.cancel();
        assert!(stream.next(&cancelled).await.is_none());
        drop(stream);
        assert!(conn.is_alive());

        read_frame(&mut peer).await;
        read_frame(&mut peer).await;
        write_frame(&mut peer, &[0, 1, 0x80, 0]).await;
        write_frame(&mut peer, &[0, 2, 0x80, 0]).await;
        assert_eq!(other.next(&cancel).await.unwrap().id(), Some(2));
        assert!(conn.is_alive());
    }

    #[tokio::test]
    async fn test_response_timeout_closes_connection() {
        let (conn, _peer) = pipelined(8, None);
        let cancel = CancellationToken::new();

        let mut stream = conn.exchange(&[0, 1, 0, 0], expected(1), &cancel).await.unwrap();
        assert!(stream.next(&cancel).await.is_none());
        assert!(!conn.is_alive());
    }

    #[tokio::test]
    async fn test_peer_close_ends_streams() {
        let (conn, mut peer) = pipelined(8, None);
        let cancel = CancellationToken::new();

        let mut stream = conn.exchange(&[0, 7, 0, 0], expected(7), &cancel).await.unwrap();
        read_frame(&mut peer).await;
        drop(peer);

        assert!(stream.next(&cancel).await.is_none());
        assert!(!conn.is_alive());
    }
}
