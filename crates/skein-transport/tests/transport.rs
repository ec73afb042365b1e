//! Loopback tests of the query transport against fake servers.

use skein_proto::rdata::{A, SOA};
use skein_proto::{Message, Name, Question, RData, RecordType, ResourceRecord, ResponseCode};
use skein_transport::{
    Connection, EndpointInfo, FailureReason, TcpConnection, Transport, TransportConfig,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;

fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

fn a(owner: &str, last: u8) -> ResourceRecord {
    ResourceRecord::from_rdata(
        name(owner),
        300,
        RData::A(A::new(Ipv4Addr::new(192, 0, 2, last))),
    )
}

fn soa() -> ResourceRecord {
    ResourceRecord::from_rdata(
        name("example.com."),
        3600,
        RData::SOA(SOA::new(
            name("ns1.example.com."),
            name("hostmaster.example.com."),
            2024010101,
            7200,
            3600,
            1209600,
            300,
        )),
    )
}

fn config(port: u16) -> TransportConfig {
    TransportConfig {
        port,
        query_timeout_ms: 2000,
        connect_timeout_ms: 1000,
        ..Default::default()
    }
}

fn localhost() -> EndpointInfo {
    EndpointInfo::new(Ipv4Addr::LOCALHOST.into())
}

async fn read_message(stream: &mut TcpStream) -> Option<Message> {
    let len = stream.read_u16().await.ok()? as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.ok()?;
    Message::parse(&buf).ok()
}

async fn write_message(stream: &mut TcpStream, message: &Message) {
    let wire = message.to_wire().unwrap();
    stream.write_u16(wire.len() as u16).await.unwrap();
    stream.write_all(&wire).await.unwrap();
}

/// Binds a TCP listener and a UDP socket on the same loopback port.
async fn bind_pair() -> (TcpListener, UdpSocket) {
    loop {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        if let Ok(udp) = UdpSocket::bind(("127.0.0.1", port)).await {
            return (listener, udp);
        }
    }
}

#[tokio::test]
async fn test_udp_answer() {
    let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = udp.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (len, from) = udp.recv_from(&mut buf).await.unwrap();
        let query = Message::parse(&buf[..len]).unwrap();
        let mut response = query.create_response_instance();
        response.add_answer(a("www.example.com.", 1));
        udp.send_to(&response.to_wire().unwrap(), from).await.unwrap();
    });

    let transport = Transport::new(config(port));
    let query = Message::query(Question::internet(name("www.example.com."), RecordType::A));
    let response = transport
        .query(&localhost(), &query, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.id(), query.id());
    assert_eq!(response.answers().len(), 1);
    assert_eq!(transport.cached_connections(), 0);
}

#[tokio::test]
async fn test_truncated_udp_retries_over_tcp() {
    let (listener, udp) = bind_pair().await;
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (len, from) = udp.recv_from(&mut buf).await.unwrap();
        let query = Message::parse(&buf[..len]).unwrap();
        let mut response = query.create_response_instance();
        response.set_truncated(true);
        udp.send_to(&response.to_wire().unwrap(), from).await.unwrap();
    });

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let query = read_message(&mut stream).await.unwrap();
        let mut response = query.create_response_instance();
        for i in 1..=3 {
            response.add_answer(a("big.example.com.", i));
        }
        write_message(&mut stream, &response).await;
        // Keep the connection open until the client hangs up.
        let _ = read_message(&mut stream).await;
    });

    let transport = Transport::new(config(port));
    let query = Message::query(Question::internet(name("big.example.com."), RecordType::A));
    let response = transport
        .query(&localhost(), &query, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!response.is_truncated());
    assert_eq!(response.answers().len(), 3);
    assert_eq!(transport.cached_connections(), 1);
}

#[tokio::test]
async fn test_multi_message_zone_transfer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let query = read_message(&mut stream).await.unwrap();
        assert!(query.question().unwrap().is_zone_transfer());

        let mut first = query.create_response_instance();
        first.add_answers([soa(), a("a.example.com.", 1), a("b.example.com.", 2)]);
        write_message(&mut stream, &first).await;

        let mut second = query.create_response_instance();
        second.add_answers([a("c.example.com.", 3)]);
        write_message(&mut stream, &second).await;

        let mut last = query.create_response_instance();
        last.add_answers([a("d.example.com.", 4), soa()]);
        write_message(&mut stream, &last).await;

        let _ = read_message(&mut stream).await;
    });

    let transport = Transport::new(config(port));
    let query = Message::query(Question::internet(name("example.com."), RecordType::AXFR));
    let response = transport
        .query(&localhost(), &query, &CancellationToken::new())
        .await
        .unwrap();

    let answers = response.answers();
    assert_eq!(answers.len(), 6);
    assert!(answers.first().unwrap().is(RecordType::SOA));
    assert!(answers.last().unwrap().is(RecordType::SOA));
}

fn answer_with_owner(query: &Message) -> Message {
    let mut response = query.create_response_instance();
    let owner = query.question().unwrap().qname.clone();
    response.add_answer(ResourceRecord::from_rdata(
        owner,
        60,
        RData::A(A::new(Ipv4Addr::LOCALHOST)),
    ));
    response
}

#[tokio::test]
async fn test_concurrent_queries_share_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let warm = read_message(&mut stream).await.unwrap();
        write_message(&mut stream, &answer_with_owner(&warm)).await;

        let q1 = read_message(&mut stream).await.unwrap();
        let q2 = read_message(&mut stream).await.unwrap();

        // Answer in reverse order.
        write_message(&mut stream, &answer_with_owner(&q2)).await;
        write_message(&mut stream, &answer_with_owner(&q1)).await;
        let _ = read_message(&mut stream).await;
    });

    let transport = Transport::new(TransportConfig {
        udp_enabled: false,
        ..config(port)
    });
    let endpoint = localhost();
    let cancel = CancellationToken::new();

    let warm = Message::query(Question::internet(name("warm.example."), RecordType::A));
    assert!(transport.query(&endpoint, &warm, &cancel).await.is_some());
    assert_eq!(transport.cached_connections(), 1);

    let q1 = Message::query(Question::internet(name("one.example."), RecordType::A));
    let mut q2 = Message::query(Question::internet(name("two.example."), RecordType::A));
    if q2.id() == q1.id() {
        q2.set_id(q1.id().wrapping_add(1));
    }

    let (r1, r2) = tokio::join!(
        transport.query(&endpoint, &q1, &cancel),
        transport.query(&endpoint, &q2, &cancel),
    );
    let (r1, r2) = (r1.unwrap(), r2.unwrap());

    assert_eq!(r1.id(), q1.id());
    assert_eq!(r1.answers()[0].name(), &name("one.example."));
    assert_eq!(r2.id(), q2.id());
    assert_eq!(r2.answers()[0].name(), &name("two.example."));
    assert_eq!(transport.cached_connections(), 1);
}

#[tokio::test]
async fn test_server_closing_idle_connection_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        // First connection answers one query and then hangs up.
        let (mut stream, _) = listener.accept().await.unwrap();
        let query = read_message(&mut stream).await.unwrap();
        write_message(&mut stream, &answer_with_owner(&query)).await;
        drop(stream);

        let (mut stream, _) = listener.accept().await.unwrap();
        let query = read_message(&mut stream).await.unwrap();
        write_message(&mut stream, &answer_with_owner(&query)).await;
        let _ = read_message(&mut stream).await;
    });

    let transport = Transport::new(TransportConfig {
        udp_enabled: false,
        ..config(port)
    });
    let endpoint = localhost();
    let cancel = CancellationToken::new();

    let first = Message::query(Question::internet(name("one.example."), RecordType::A));
    assert!(transport.query(&endpoint, &first, &cancel).await.is_some());
    assert_eq!(transport.cached_connections(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let second = Message::query(Question::internet(name("two.example."), RecordType::A));
    let response = transport.query(&endpoint, &second, &cancel).await.unwrap();
    assert_eq!(response.id(), second.id());
    assert_eq!(response.answers()[0].name(), &name("two.example."));
    assert_eq!(transport.cached_connections(), 1);
}

#[tokio::test]
async fn test_resolve_maps_server_error() {
    let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = udp.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (len, from) = udp.recv_from(&mut buf).await.unwrap();
        let query = Message::parse(&buf[..len]).unwrap();
        let mut response = query.create_response_instance();
        response.set_rcode(ResponseCode::NXDomain).unwrap();
        udp.send_to(&response.to_wire().unwrap(), from).await.unwrap();
    });

    let transport = Transport::new(config(port));
    let query = Message::query(Question::internet(name("missing.example."), RecordType::A));
    let failure = transport
        .resolve(&localhost(), &query, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.reason(), FailureReason::DnsServerError);
    assert_eq!(failure.rcode(), Some(ResponseCode::NXDomain));
    assert_eq!(failure.name(), &name("missing.example."));
}

#[tokio::test]
async fn test_resolve_unreachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let transport = Transport::new(config(port));
    let query = Message::query(Question::internet(name("example.com."), RecordType::AXFR));
    let failure = transport
        .resolve(&localhost(), &query, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.reason(), FailureReason::QueryTimeout);
    assert_eq!(failure.rcode(), None);
}

#[tokio::test]
async fn test_tcp_connection_framing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(&[0x00, 0x03, 0xAA, 0xBB, 0xCC]).await.unwrap();
        // Announce 16 bytes, deliver 2, then hang up.
        stream.write_all(&[0x00, 0x10, 0x01, 0x02]).await.unwrap();
    });

    let cancel = CancellationToken::new();
    let conn = TcpConnection::connect(&localhost(), port, Duration::from_secs(1), &cancel)
        .await
        .unwrap();
    assert_eq!(conn.remote_addr(), SocketAddr::from(([127, 0, 0, 1], port)));

    let frame = conn.receive(&cancel).await.unwrap();
    assert_eq!(frame.data.as_ref(), &[0xAA, 0xBB, 0xCC]);
    assert!(conn.is_alive());

    assert!(conn.receive(&cancel).await.is_none());
    assert!(conn.is_faulty());
    assert!(!conn.is_alive());
}

#[tokio::test]
async fn test_connect_refused_returns_none() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let conn = TcpConnection::connect(
        &localhost(),
        port,
        Duration::from_millis(500),
        &CancellationToken::new(),
    )
    .await;
    assert!(conn.is_none());
}
