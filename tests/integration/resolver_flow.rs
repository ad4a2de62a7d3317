//! Full-server tests: real sockets on ephemeral ports, driving the query
//! path through registry hit, silent drop, and upstream proxying.

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use uwsgi_dns::server::{DnsServer, QueryHandler};
use uwsgi_dns_application::ports::UpstreamForwarder;
use uwsgi_dns_application::use_cases::HandleDnsQueryUseCase;
use uwsgi_dns_application::DomainRegistry;
use uwsgi_dns_domain::Fqdn;
use uwsgi_dns_infrastructure::dns::framing::{read_framed, write_framed};
use uwsgi_dns_infrastructure::dns::{LocalAnswerTemplate, ProxyForwarder};

struct TestServer {
    udp_addr: SocketAddr,
    tcp_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn start_server(
    registry: Arc<DomainRegistry>,
    upstream: Option<Arc<dyn UpstreamForwarder>>,
) -> TestServer {
    let use_case = Arc::new(HandleDnsQueryUseCase::new(registry, upstream));
    let handler = QueryHandler::new(use_case, Arc::new(LocalAnswerTemplate::new()));
    let server = DnsServer::bind("127.0.0.1:0", handler).unwrap();
    let udp_addr = server.udp_addr().unwrap();
    let tcp_addr = server.tcp_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(server.run(shutdown.clone()));
    TestServer {
        udp_addr,
        tcp_addr,
        shutdown,
    }
}

fn query_bytes(id: u16, name: &str) -> Vec<u8> {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(Name::from_str(name).unwrap(), RecordType::A));
    message.to_vec().unwrap()
}

async fn udp_exchange(server: SocketAddr, query: &[u8]) -> Vec<u8> {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(query, server).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let len = tokio::time::timeout(Duration::from_secs(5), socket.recv(&mut buf))
        .await
        .expect("no reply within deadline")
        .unwrap();
    buf.truncate(len);
    buf
}

fn assert_localhost_answer(reply: &Message, name: &str) {
    assert_eq!(reply.response_code(), ResponseCode::NoError);
    assert_eq!(reply.answers().len(), 1);
    let answer = &reply.answers()[0];
    assert_eq!(answer.name(), &Name::from_str(name).unwrap());
    match answer.data() {
        Some(RData::A(a)) => assert_eq!(a.0, Ipv4Addr::LOCALHOST),
        other => panic!("expected an A record, got {other:?}"),
    }
}

#[tokio::test]
async fn registered_domain_resolves_to_localhost_over_udp() {
    let registry = Arc::new(DomainRegistry::new());
    registry.add(&Fqdn::new("example.com"));
    let server = start_server(registry, None);

    let raw = udp_exchange(server.udp_addr, &query_bytes(0x1234, "example.com.")).await;
    let reply = Message::from_vec(&raw).unwrap();

    assert_eq!(reply.id(), 0x1234);
    assert_localhost_answer(&reply, "example.com.");
}

#[tokio::test]
async fn case_and_dot_variants_hit_the_same_registration() {
    let registry = Arc::new(DomainRegistry::new());
    registry.add(&Fqdn::new("MiXeD.Example"));
    let server = start_server(registry, None);

    let raw = udp_exchange(server.udp_addr, &query_bytes(7, "mixed.example.")).await;
    let reply = Message::from_vec(&raw).unwrap();
    assert_localhost_answer(&reply, "mixed.example.");
}

#[tokio::test]
async fn unregistered_domain_without_proxy_is_silently_dropped() {
    let server = start_server(Arc::new(DomainRegistry::new()), None);

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket
        .send_to(&query_bytes(1, "nowhere.example."), server.udp_addr)
        .await
        .unwrap();

    let mut buf = [0u8; 512];
    let outcome = tokio::time::timeout(Duration::from_millis(300), socket.recv(&mut buf)).await;
    assert!(outcome.is_err(), "expected silence, got a reply");
}

#[tokio::test]
async fn unregistered_domain_with_proxy_relays_upstream_reply_unmodified() {
    // Canned upstream: any query gets the same fixed response bytes.
    let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = upstream.local_addr().unwrap();

    let mut canned = Message::new();
    canned
        .set_id(0x4242)
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_available(true)
        .add_answer(Record::from_rdata(
            Name::from_str("nowhere.example.").unwrap(),
            300,
            RData::A(A(Ipv4Addr::new(192, 0, 2, 77))),
        ));
    let canned_bytes = canned.to_vec().unwrap();

    let upstream_reply = canned_bytes.clone();
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            let Ok((_, peer)) = upstream.recv_from(&mut buf).await else {
                break;
            };
            let _ = upstream.send_to(&upstream_reply, peer).await;
        }
    });

    let forwarder = Arc::new(ProxyForwarder::new(
        upstream_addr.ip().to_string(),
        upstream_addr.port(),
        Duration::from_secs(5),
    ));
    let server = start_server(Arc::new(DomainRegistry::new()), Some(forwarder));

    let raw = udp_exchange(server.udp_addr, &query_bytes(9, "nowhere.example.")).await;
    assert_eq!(raw, canned_bytes);
}

#[tokio::test]
async fn registered_domain_resolves_over_tcp_with_framing() {
    let registry = Arc::new(DomainRegistry::new());
    registry.add(&Fqdn::new("stream.example"));
    let server = start_server(registry, None);

    let mut stream = TcpStream::connect(server.tcp_addr).await.unwrap();

    // Two queries on one connection: the framing must keep them apart.
    for id in [21u16, 22] {
        write_framed(&mut stream, &query_bytes(id, "stream.example."))
            .await
            .unwrap();
        let raw = read_framed(&mut stream).await.unwrap();
        let reply = Message::from_vec(&raw).unwrap();
        assert_eq!(reply.id(), id);
        assert_localhost_answer(&reply, "stream.example.");
    }
}

#[tokio::test]
async fn garbage_datagram_does_not_stop_the_server() {
    let registry = Arc::new(DomainRegistry::new());
    registry.add(&Fqdn::new("sturdy.example"));
    let server = start_server(registry, None);

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket
        .send_to(b"definitely not dns", server.udp_addr)
        .await
        .unwrap();

    let raw = udp_exchange(server.udp_addr, &query_bytes(3, "sturdy.example.")).await;
    let reply = Message::from_vec(&raw).unwrap();
    assert_localhost_answer(&reply, "sturdy.example.");
}
