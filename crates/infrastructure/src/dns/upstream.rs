use async_trait::async_trait;
use hickory_proto::op::Message;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tracing::debug;
use uwsgi_dns_application::ports::UpstreamForwarder;
use uwsgi_dns_domain::{DomainError, Transport};

use super::framing::{read_framed, write_framed};

/// Largest UDP response accepted from upstream.
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Relays raw DNS queries to the configured upstream server over UDP or
/// TCP, matching the transport the query arrived on. Every await on the
/// round trip is bounded by the configured timeout.
pub struct ProxyForwarder {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ProxyForwarder {
    pub fn new(host: String, port: u16, timeout: Duration) -> Self {
        Self {
            host,
            port,
            timeout,
        }
    }

    pub fn server(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn forward_udp(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| DomainError::UpstreamFailure(format!("binding UDP socket: {e}")))?;
        socket
            .connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                DomainError::UpstreamFailure(format!("connecting to {}: {e}", self.server()))
            })?;

        tokio::time::timeout(self.timeout, socket.send(query))
            .await
            .map_err(|_| DomainError::UpstreamTimeout {
                server: self.server(),
            })?
            .map_err(|e| {
                DomainError::UpstreamFailure(format!("sending to {}: {e}", self.server()))
            })?;

        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let received = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| DomainError::UpstreamTimeout {
                server: self.server(),
            })?
            .map_err(|e| {
                DomainError::UpstreamFailure(format!("receiving from {}: {e}", self.server()))
            })?;
        buf.truncate(received);
        Ok(buf)
    }

    async fn forward_tcp(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let mut stream = tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| DomainError::UpstreamTimeout {
                server: self.server(),
            })?
            .map_err(|e| {
                DomainError::UpstreamFailure(format!("connecting to {}: {e}", self.server()))
            })?;
        stream.set_nodelay(true).map_err(|e| {
            DomainError::UpstreamFailure(format!("setting TCP_NODELAY: {e}"))
        })?;

        tokio::time::timeout(self.timeout, write_framed(&mut stream, query))
            .await
            .map_err(|_| DomainError::UpstreamTimeout {
                server: self.server(),
            })??;

        let reply = tokio::time::timeout(self.timeout, read_framed(&mut stream))
            .await
            .map_err(|_| DomainError::UpstreamTimeout {
                server: self.server(),
            })??;
        Ok(reply)
    }
}

#[async_trait]
impl UpstreamForwarder for ProxyForwarder {
    async fn forward(&self, query: &[u8], transport: Transport) -> Result<Vec<u8>, DomainError> {
        let reply = match transport {
            Transport::Udp => self.forward_udp(query).await?,
            Transport::Tcp => self.forward_tcp(query).await?,
        };

        // The reply is relayed unmodified, but it must at least be DNS.
        Message::from_vec(&reply).map_err(|e| {
            DomainError::UpstreamFailure(format!("invalid response from {}: {e}", self.server()))
        })?;

        debug!(
            server = %self.server(),
            transport = %transport,
            reply_len = reply.len(),
            "Upstream round trip complete"
        );
        Ok(reply)
    }
}
