//! Query exchange over UDP and TCP.
//!
//! UDP is tried first unless the query asks for a reliable transport or is
//! too large for a datagram. A truncated UDP response is re-sent over TCP.
//! TCP connections are pipelined and cached per server address. Zone
//! transfers keep reading until the closing SOA arrives, and their answers
//! are merged into one response.

use crate::config::TransportConfig;
use crate::connection::{Connection, TcpConnection, UdpConnection};
use crate::endpoint::{EndpointInfo, FramedPacket, MessageIdentification};
use crate::failure::{FailureReason, ResolutionFailure};
use crate::pipeline::{PipelinedConnection, ResponseStream};
use bytes::Bytes;
use parking_lot::Mutex;
use skein_proto::{Message, Name, ResponseCode};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Sends queries to servers and collects their responses.
#[derive(Debug)]
pub struct Transport {
    config: TransportConfig,
    connections: Mutex<HashMap<SocketAddr, Arc<PipelinedConnection>>>,
}

impl Transport {
    /// Creates a transport.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the number of cached TCP connections.
    pub fn cached_connections(&self) -> usize {
        self.connections.lock().len()
    }

    /// Closes every cached connection.
    pub fn close_all(&self) {
        for (_, conn) in self.connections.lock().drain() {
            conn.close();
        }
    }

    /// Largest query that may go out as one datagram.
    ///
    /// 512 bytes, or the payload size advertised in the query's EDNS record.
    pub fn max_udp_query_size(query: &Message) -> usize {
        query.max_udp_payload_size()
    }

    /// Sends `query` to `endpoint` and returns the response.
    ///
    /// Returns `None` if no usable response was obtained; the caller should
    /// try another endpoint.
    pub async fn query(
        &self,
        endpoint: &EndpointInfo,
        query: &Message,
        cancel: &CancellationToken,
    ) -> Option<Message> {
        let wire = match query.to_wire() {
            Ok(wire) => wire,
            Err(e) => {
                warn!(server = %endpoint, error = %e, "Failed to encode query");
                return None;
            }
        };

        let use_udp = self.config.udp_enabled
            && !query.is_reliable_sending_requested()
            && wire.len() <= Self::max_udp_query_size(query);

        if use_udp {
            let response = self.query_udp(endpoint, query, &wire, cancel).await?;
            if !response.is_reliable_resending_requested() {
                return Some(response);
            }
            if !self.config.tcp_enabled {
                debug!(server = %endpoint, id = query.id(), "Truncated response, TCP disabled");
                return Some(response);
            }
            trace!(server = %endpoint, id = query.id(), "Response truncated, retrying with TCP");
        } else if !self.config.tcp_enabled {
            debug!(server = %endpoint, id = query.id(), "Query needs TCP, which is disabled");
            return None;
        }

        self.query_tcp(endpoint, query, &wire, cancel).await
    }

    /// Like [`query`](Self::query), but maps every outcome other than a
    /// NOERROR response onto a [`ResolutionFailure`].
    pub async fn resolve(
        &self,
        endpoint: &EndpointInfo,
        query: &Message,
        cancel: &CancellationToken,
    ) -> Result<Message, ResolutionFailure> {
        let Some(question) = query.question() else {
            return Err(ResolutionFailure::new(FailureReason::InvalidQuery, Name::root()));
        };
        let name = question.qname.clone();

        match self.query(endpoint, query, cancel).await {
            None => Err(ResolutionFailure::new(FailureReason::QueryTimeout, name)),
            Some(response) if response.rcode() != ResponseCode::NoError => {
                Err(ResolutionFailure::from_response_code(response.rcode(), name))
            }
            Some(response) => Ok(response),
        }
    }

    async fn query_udp(
        &self,
        endpoint: &EndpointInfo,
        query: &Message,
        wire: &[u8],
        cancel: &CancellationToken,
    ) -> Option<Message> {
        let buffer = (self.config.udp_payload_size as usize).max(query.max_udp_payload_size());
        let conn = UdpConnection::connect(
            endpoint,
            self.config.port,
            self.config.query_timeout(),
            buffer,
        )
        .await?;

        if !conn.send(wire, cancel).await {
            return None;
        }
        let packet = conn
            .receive_matching(&endpoint.identification(query.id()), cancel)
            .await;
        conn.close().await;

        parse_response(&packet?)
    }

    async fn query_tcp(
        &self,
        endpoint: &EndpointInfo,
        query: &Message,
        wire: &Bytes,
        cancel: &CancellationToken,
    ) -> Option<Message> {
        let expected = endpoint.identification(query.id());

        let (conn, mut stream) = match self.cached(endpoint) {
            Some(conn) => match conn.exchange(wire, expected, cancel).await {
                Some(stream) => (conn, stream),
                None => {
                    debug!(server = %conn.remote_addr(), "Cached connection unusable, reconnecting");
                    self.evict(&conn);
                    self.open_and_send(endpoint, wire, expected, cancel).await?
                }
            },
            None => self.open_and_send(endpoint, wire, expected, cancel).await?,
        };

        let response = self.collect(query, &mut stream, cancel).await;
        drop(stream);

        if conn.is_alive() {
            conn.restart_idle_timeout(self.config.idle_timeout());
        } else {
            self.evict(&conn);
        }
        response
    }

    /// Reads the response and, for zone transfers, every continuation.
    async fn collect(
        &self,
        query: &Message,
        stream: &mut ResponseStream,
        cancel: &CancellationToken,
    ) -> Option<Message> {
        let mut response = parse_response(&stream.next(cancel).await?)?;
        if !response.is_next_message_waiting(false) {
            return Some(response);
        }

        let mut messages = 1usize;
        loop {
            let mut next = parse_response(&stream.next(cancel).await?)?;
            messages += 1;
            if next.rcode() != ResponseCode::NoError {
                debug!(id = query.id(), rcode = %next.rcode(), "Zone transfer aborted by server");
                return Some(next);
            }

            let waiting = next.is_next_message_waiting(true);
            response.add_answers(next.take_answers());
            if !waiting {
                break;
            }
        }

        debug!(
            id = query.id(),
            messages,
            answers = response.answers().len(),
            "Zone transfer complete"
        );
        Some(response)
    }

    async fn open_and_send(
        &self,
        endpoint: &EndpointInfo,
        wire: &[u8],
        expected: MessageIdentification,
        cancel: &CancellationToken,
    ) -> Option<(Arc<PipelinedConnection>, ResponseStream)> {
        let tcp = TcpConnection::connect(
            endpoint,
            self.config.port,
            self.config.connect_timeout(),
            cancel,
        )
        .await?;
        let conn = Arc::new(PipelinedConnection::new(
            Arc::new(tcp.with_io_timeout(self.config.query_timeout())),
            self.config.max_pipelined_queries,
            self.config.query_timeout(),
            self.config.idle_timeout(),
        ));
        self.connections
            .lock()
            .insert(conn.remote_addr(), Arc::clone(&conn));

        let stream = conn.exchange(wire, expected, cancel).await?;
        Some((conn, stream))
    }

    fn cached(&self, endpoint: &EndpointInfo) -> Option<Arc<PipelinedConnection>> {
        let addr = SocketAddr::new(endpoint.server_address, self.config.port);
        let mut connections = self.connections.lock();
        match connections.get(&addr) {
            Some(conn) if conn.is_alive() => Some(Arc::clone(conn)),
            Some(_) => {
                connections.remove(&addr);
                None
            }
            None => None,
        }
    }

    fn evict(&self, conn: &Arc<PipelinedConnection>) {
        let mut connections = self.connections.lock();
        if connections
            .get(&conn.remote_addr())
            .is_some_and(|cached| Arc::ptr_eq(cached, conn))
        {
            connections.remove(&conn.remote_addr());
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close_all();
    }
}

fn parse_response(packet: &FramedPacket) -> Option<Message> {
    match Message::parse(&packet.data) {
        Ok(message) if message.is_response() => Some(message),
        Ok(message) => {
            warn!(server = %packet.destination, id = message.id(), "Ignoring non-response message");
            None
        }
        Err(e) => {
            warn!(server = %packet.destination, error = %e, "Malformed response");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_proto::{Edns, Question, RecordType};
    use std::str::FromStr;

    fn query(rtype: RecordType) -> Message {
        Message::query(Question::internet(
            Name::from_str("example.com.").unwrap(),
            rtype,
        ))
    }

    #[test]
    fn test_max_udp_query_size() {
        let mut q = query(RecordType::A);
        assert_eq!(Transport::max_udp_query_size(&q), 512);
        q.set_edns(Some(Edns::new()));
        assert_eq!(Transport::max_udp_query_size(&q), 4096);
    }

    #[tokio::test]
    async fn test_resolve_without_question() {
        let transport = Transport::new(TransportConfig::default());
        let endpoint = EndpointInfo::new("127.0.0.1".parse().unwrap());
        let failure = transport
            .resolve(&endpoint, &Message::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(failure.reason(), FailureReason::InvalidQuery);
    }

    #[tokio::test]
    async fn test_tcp_required_but_disabled() {
        let transport = Transport::new(TransportConfig {
            tcp_enabled: false,
            ..Default::default()
        });
        let endpoint = EndpointInfo::new("127.0.0.1".parse().unwrap());
        let cancel = CancellationToken::new();
        assert!(transport
            .query(&endpoint, &query(RecordType::AXFR), &cancel)
            .await
            .is_none());
    }
}
