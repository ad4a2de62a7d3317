use hickory_proto::op::Message;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uwsgi_dns_application::use_cases::{DnsRequest, HandleDnsQueryUseCase, QueryOutcome};
use uwsgi_dns_domain::{DomainError, Fqdn, Transport};
use uwsgi_dns_infrastructure::dns::framing::{read_framed, write_framed};
use uwsgi_dns_infrastructure::dns::LocalAnswerTemplate;

const MAX_UDP_QUERY_SIZE: usize = 4096;

/// Turns one raw DNS message into one raw reply, or nothing.
///
/// `None` means the query is deliberately dropped: undecodable bytes,
/// unsubscribed names with proxying off, or an upstream failure. The
/// caller sends whatever comes back and nothing otherwise.
pub struct QueryHandler {
    use_case: Arc<HandleDnsQueryUseCase>,
    template: Arc<LocalAnswerTemplate>,
}

impl QueryHandler {
    pub fn new(use_case: Arc<HandleDnsQueryUseCase>, template: Arc<LocalAnswerTemplate>) -> Self {
        Self { use_case, template }
    }

    pub async fn handle(
        &self,
        raw: &[u8],
        transport: Transport,
        peer: SocketAddr,
    ) -> Option<Vec<u8>> {
        trace!(peer = %peer, transport = %transport, len = raw.len(), "Received query bytes");

        let query = match Message::from_vec(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Dropping undecodable DNS message");
                return None;
            }
        };

        let question = match query.queries().first() {
            Some(question) => question,
            None => {
                debug!(peer = %peer, id = query.id(), "Dropping query without a question");
                return None;
            }
        };
        debug!(
            peer = %peer,
            id = query.id(),
            name = %question.name(),
            query_type = %question.query_type(),
            "Decoded request"
        );

        let request = DnsRequest {
            name: Fqdn::new(&question.name().to_utf8()),
            transport,
            raw,
        };

        let reply = match self.use_case.execute(&request).await {
            Ok(QueryOutcome::Local) => {
                let reply = self.template.build_reply(&query);
                debug!(
                    id = reply.id(),
                    answers = reply.answers().len(),
                    truncated = reply.truncated(),
                    "Decoded reply"
                );
                match reply.to_vec() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        error!(peer = %peer, error = %e, "Failed to serialize local reply");
                        return None;
                    }
                }
            }
            Ok(QueryOutcome::Proxied(bytes)) => {
                if let Ok(reply) = Message::from_vec(&bytes) {
                    debug!(
                        id = reply.id(),
                        answers = reply.answers().len(),
                        truncated = reply.truncated(),
                        "Decoded upstream reply"
                    );
                }
                bytes
            }
            Err(DomainError::NotLocalNoProxy(domain)) => {
                debug!(peer = %peer, domain = %domain, "Dropping query for unsubscribed domain");
                return None;
            }
            Err(e) => {
                error!(peer = %peer, error = %e, "Dropping query after upstream failure");
                return None;
            }
        };

        trace!(peer = %peer, len = reply.len(), "Sending reply bytes");
        Some(reply)
    }
}

/// The DNS front end: a UDP socket and a TCP listener on the same
/// address, each dispatching one worker per query so a slow upstream
/// round trip never stalls the others.
pub struct DnsServer {
    udp: Arc<UdpSocket>,
    tcp: TcpListener,
    handler: Arc<QueryHandler>,
}

impl DnsServer {
    /// Bind both transports. Must run inside the tokio runtime.
    pub fn bind(bind_addr: &str, handler: QueryHandler) -> anyhow::Result<Self> {
        let socket_addr: SocketAddr = bind_addr.parse()?;
        Ok(Self {
            udp: Arc::new(create_udp_socket(socket_addr)?),
            tcp: create_tcp_listener(socket_addr)?,
            handler: Arc::new(handler),
        })
    }

    pub fn udp_addr(&self) -> io::Result<SocketAddr> {
        self.udp.local_addr()
    }

    pub fn tcp_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    pub async fn run(self, shutdown: CancellationToken) {
        match self.udp_addr() {
            Ok(addr) => info!(addr = %addr, "DNS server started"),
            Err(_) => info!("DNS server started"),
        }

        let udp_loop = tokio::spawn(run_udp_loop(
            self.udp,
            Arc::clone(&self.handler),
            shutdown.clone(),
        ));
        let tcp_loop = tokio::spawn(run_tcp_loop(self.tcp, self.handler, shutdown));

        let _ = tokio::join!(udp_loop, tcp_loop);
        info!("DNS server stopped");
    }
}

async fn run_udp_loop(
    socket: Arc<UdpSocket>,
    handler: Arc<QueryHandler>,
    shutdown: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_UDP_QUERY_SIZE];
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    let datagram = buf[..len].to_vec();
                    let socket = Arc::clone(&socket);
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Some(reply) = handler.handle(&datagram, Transport::Udp, peer).await {
                            if let Err(e) = socket.send_to(&reply, peer).await {
                                error!(peer = %peer, error = %e, "Failed to send UDP reply");
                            }
                        }
                    });
                }
                Err(e) => error!(error = %e, "UDP receive error"),
            }
        }
    }
}

async fn run_tcp_loop(
    listener: TcpListener,
    handler: Arc<QueryHandler>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let handler = Arc::clone(&handler);
                    let shutdown = shutdown.clone();
                    tokio::spawn(serve_tcp_connection(stream, peer, handler, shutdown));
                }
                Err(e) => error!(error = %e, "TCP accept error"),
            }
        }
    }
}

/// One connection may carry any number of length-framed queries; the loop
/// ends when the peer closes, a frame is broken, or shutdown is signaled.
async fn serve_tcp_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<QueryHandler>,
    shutdown: CancellationToken,
) {
    loop {
        let query = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = read_framed(&mut stream) => match read {
                Ok(bytes) => bytes,
                Err(e) => {
                    trace!(peer = %peer, error = %e, "TCP connection closed");
                    break;
                }
            }
        };

        if let Some(reply) = handler.handle(&query, Transport::Tcp, peer).await {
            if let Err(e) = write_framed(&mut stream, &reply).await {
                warn!(peer = %peer, error = %e, "Failed to send TCP reply");
                break;
            }
        }
    }
}

fn create_udp_socket(socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(socket_domain(socket_addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

fn create_tcp_listener(socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(
        socket_domain(socket_addr),
        Type::STREAM,
        Some(Protocol::TCP),
    )?;
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}

fn socket_domain(socket_addr: SocketAddr) -> Domain {
    if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    }
}
