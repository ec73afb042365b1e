//! Stream connections with 2-byte length framing (RFC 1035 section 4.2.2).

use super::Connection;
use crate::endpoint::{EndpointInfo, FramedPacket};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use skein_proto::MAX_STREAM_MESSAGE_SIZE;
use socket2::{Domain, Protocol, Socket, Type};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// A TCP connection to a DNS server.
pub type TcpConnection = StreamConnection<OwnedReadHalf, OwnedWriteHalf>;

/// A framed connection over any byte stream.
///
/// The read and write halves are locked independently, so one writer and
/// one reader may be active at the same time.
#[derive(Debug)]
pub struct StreamConnection<R, W> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
    remote: SocketAddr,
    local: SocketAddr,
    io_timeout: Duration,
    faulty: AtomicBool,
}

impl TcpConnection {
    /// Connects to `endpoint` on `port`.
    ///
    /// `timeout` bounds the connect and every later read or write. Returns
    /// `None` if the connection cannot be established.
    pub async fn connect(
        endpoint: &EndpointInfo,
        port: u16,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<Self> {
        let remote = SocketAddr::new(endpoint.server_address, port);

        let socket = match tcp_socket(endpoint, remote) {
            Ok(socket) => socket,
            Err(e) => {
                debug!(server = %remote, error = %e, "Failed to create TCP socket");
                return None;
            }
        };

        let stream = match guarded(timeout, cancel, socket.connect(remote)).await {
            Some(Ok(stream)) => stream,
            Some(Err(e)) => {
                debug!(server = %remote, error = %e, "TCP connect failed");
                return None;
            }
            None => {
                debug!(server = %remote, "TCP connect timed out or was cancelled");
                return None;
            }
        };

        let local = stream.local_addr().ok()?;
        let (reader, writer) = stream.into_split();
        debug!(server = %remote, local = %local, "TCP connection established");

        Some(Self::from_parts(reader, writer, remote, local, timeout))
    }
}

/// Builds an unconnected socket in the destination's address family.
fn tcp_socket(endpoint: &EndpointInfo, remote: SocketAddr) -> io::Result<TcpSocket> {
    let socket = Socket::new(Domain::for_address(remote), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nodelay(true)?;
    socket.set_nonblocking(true)?;

    if let Some(local) = endpoint.local_address {
        socket.bind(&SocketAddr::new(local, 0).into())?;
    }

    let std_stream: std::net::TcpStream = socket.into();
    Ok(TcpSocket::from_std_stream(std_stream))
}

/// Runs `fut` unless `timeout` elapses or `cancel` fires first.
async fn guarded<F: Future>(
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        () = cancel.cancelled() => None,
        res = tokio::time::timeout(timeout, fut) => res.ok(),
    }
}

impl<R, W> StreamConnection<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps already connected stream halves.
    pub fn from_parts(
        reader: R,
        writer: W,
        remote: SocketAddr,
        local: SocketAddr,
        io_timeout: Duration,
    ) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
            remote,
            local,
            io_timeout,
            faulty: AtomicBool::new(false),
        }
    }

    /// Replaces the read/write timeout.
    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    async fn read_frame(&self, cancel: &CancellationToken) -> io::Result<Option<Bytes>> {
        let mut reader = self.reader.lock().await;

        let read = async {
            let mut len_buf = [0u8; 2];
            reader.read_exact(&mut len_buf).await?;
            let len = u16::from_be_bytes(len_buf) as usize;

            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf).await?;
            Ok::<_, io::Error>(Bytes::from(buf))
        };

        guarded(self.io_timeout, cancel, read).await.transpose()
    }
}

#[async_trait]
impl<R, W> Connection for StreamConnection<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: &[u8], cancel: &CancellationToken) -> bool {
        if self.is_faulty() {
            return false;
        }
        if message.is_empty() {
            return true;
        }
        let Ok(len) = u16::try_from(message.len()) else {
            debug!(server = %self.remote, size = message.len(), "Message too large to frame");
            return false;
        };

        let mut frame = BytesMut::with_capacity(message.len() + 2);
        frame.put_u16(len);
        frame.put_slice(message);

        let mut writer = self.writer.lock().await;
        let write = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        };

        match guarded(self.io_timeout, cancel, write).await {
            Some(Ok(())) => {
                trace!(server = %self.remote, size = message.len(), "Sent frame");
                true
            }
            Some(Err(e)) => {
                debug!(server = %self.remote, error = %e, "Write failed");
                self.mark_faulty();
                false
            }
            None => {
                debug!(server = %self.remote, "Write timed out or was cancelled");
                self.mark_faulty();
                false
            }
        }
    }

    async fn receive(&self, cancel: &CancellationToken) -> Option<FramedPacket> {
        if self.is_faulty() {
            return None;
        }

        match self.read_frame(cancel).await {
            Ok(Some(data)) => {
                trace!(server = %self.remote, size = data.len(), "Received frame");
                Some(FramedPacket::new(data, self.remote, self.local))
            }
            Ok(None) => {
                debug!(server = %self.remote, "Read timed out or was cancelled");
                self.mark_faulty();
                None
            }
            Err(e) => {
                debug!(server = %self.remote, error = %e, "Read failed");
                self.mark_faulty();
                None
            }
        }
    }

    async fn wait_readable(&self, cancel: &CancellationToken) -> bool {
        if self.is_faulty() {
            return false;
        }

        let mut reader = self.reader.lock().await;
        let readable = tokio::select! {
            () = cancel.cancelled() => return false,
            res = reader.fill_buf() => match res {
                Ok(buf) => !buf.is_empty(),
                Err(e) => {
                    debug!(server = %self.remote, error = %e, "Read failed");
                    false
                }
            },
        };

        if !readable {
            debug!(server = %self.remote, "Connection closed by peer");
            self.mark_faulty();
        }
        readable
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
        let mut writer = self.writer.lock().await;
        // The peer may already be gone.
        let _ = writer.shutdown().await;
        debug!(server = %self.remote, "Connection closed");
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn max_message_size(&self) -> usize {
        MAX_STREAM_MESSAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};

    type Duplex = StreamConnection<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn duplex_connection() -> (Duplex, DuplexStream) {
        let (ours, theirs) = duplex(4096);
        let (reader, writer) = split(ours);
        let conn = StreamConnection::from_parts(
            reader,
            writer,
            addr(53),
            addr(40000),
            Duration::from_millis(500),
        );
        (conn, theirs)
    }

    #[tokio::test]
    async fn test_send_writes_length_prefix() {
        let (conn, mut peer) = duplex_connection();
        let cancel = CancellationToken::new();

        assert!(conn.send(&[0xAB, 0xCD, 0xEF], &cancel).await);

        let mut buf = [0u8; 5];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x00, 0x03, 0xAB, 0xCD, 0xEF]);
    }

    #[tokio::test]
    async fn test_receive_full_frame() {
        let (conn, mut peer) = duplex_connection();
        let cancel = CancellationToken::new();

        // The frame arrives in two pieces.
        peer.write_all(&[0x00, 0x04, 0x12]).await.unwrap();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            peer.write_all(&[0x34, 0x00, 0x00]).await.unwrap();
            peer
        });

        conn.restart_idle_timeout(Some(Duration::from_secs(1)));
        let packet = conn.receive(&cancel).await.unwrap();
        assert_eq!(packet.len(), 4);
        assert_eq!(packet.id(), Some(0x1234));
        assert_eq!(packet.destination, addr(53));
        assert!(conn.is_alive());
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_short_frame_marks_faulty() {
        let (conn, mut peer) = duplex_connection();
        let cancel = CancellationToken::new();

        peer.write_all(&[0x00, 0x10, 1, 2, 3]).await.unwrap();
        drop(peer);

        assert!(conn.receive(&cancel).await.is_none());
        assert!(conn.is_faulty());
        assert!(!conn.is_alive());
        assert!(conn.receive(&cancel).await.is_none());
    }

    #[tokio::test]
    async fn test_write_failure_marks_faulty() {
        let (conn, peer) = duplex_connection();
        let cancel = CancellationToken::new();
        drop(peer);

        assert!(!conn.send(&[0, 1, 2, 3], &cancel).await);
        assert!(!conn.is_alive());
        assert!(!conn.send(&[0, 1, 2, 3], &cancel).await);
    }

    #[tokio::test]
    async fn test_cancelled_receive() {
        let (conn, _peer) = duplex_connection();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(conn.receive(&cancel).await.is_none());
        assert!(conn.is_faulty());
    }

    #[tokio::test]
    async fn test_receive_timeout() {
        let (conn, _peer) = duplex_connection();
        let cancel = CancellationToken::new();

        assert!(conn.receive(&cancel).await.is_none());
        assert!(conn.is_faulty());
    }

    #[tokio::test]
    async fn test_receive_matching_skips_other_ids() {
        let (conn, mut peer) = duplex_connection();
        let cancel = CancellationToken::new();

        peer.write_all(&[0x00, 0x02, 0x00, 0x01]).await.unwrap();
        peer.write_all(&[0x00, 0x02, 0x00, 0x02]).await.unwrap();

        let endpoint = EndpointInfo::new(addr(53).ip());
        let packet = conn
            .receive_matching(&endpoint.identification(2), &cancel)
            .await
            .unwrap();
        assert_eq!(packet.id(), Some(2));
    }

    #[tokio::test]
    async fn test_wait_readable() {
        let (conn, mut peer) = duplex_connection();
        let cancel = CancellationToken::new();

        peer.write_all(&[0x00, 0x02, 0xAB, 0xCD]).await.unwrap();
        assert!(conn.wait_readable(&cancel).await);
        let packet = conn.receive(&cancel).await.unwrap();
        assert_eq!(packet.id(), Some(0xABCD));

        drop(peer);
        assert!(!conn.wait_readable(&cancel).await);
        assert!(conn.is_faulty());
    }

    #[tokio::test]
    async fn test_cancelled_wait_keeps_connection() {
        let (conn, _peer) = duplex_connection();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!conn.wait_readable(&cancel).await);
        assert!(conn.is_alive());
    }

    #[tokio::test]
    async fn test_close_marks_faulty() {
        let (conn, _peer) = duplex_connection();
        conn.close().await;
        assert!(conn.is_faulty());
        assert!(!conn.send(&[0, 1], &CancellationToken::new()).await);
    }
}
