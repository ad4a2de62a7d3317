use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uwsgi_dns_application::DomainRegistry;
use uwsgi_dns_domain::{DomainError, Fqdn};

use super::packet;

/// Largest datagram the uWSGI wire format can describe (4-byte header plus
/// a u16 payload).
const MAX_PACKET_LEN: usize = 4 + u16::MAX as usize;

/// Passive UDP service receiving one subscription event per datagram.
///
/// Each packet that decodes and carries a `key` field adds one domain to
/// the registry. Nothing is ever sent back, and nothing a peer sends can
/// take the listener down: malformed input is logged and dropped.
pub struct SubscriptionListener {
    registry: Arc<DomainRegistry>,
    socket: UdpSocket,
}

impl SubscriptionListener {
    pub async fn bind(addr: &str, registry: Arc<DomainRegistry>) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { registry, socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn run(self, shutdown: CancellationToken) {
        match self.local_addr() {
            Ok(addr) => info!(addr = %addr, "uWSGI subscription listener started"),
            Err(_) => info!("uWSGI subscription listener started"),
        }

        let mut buf = vec![0u8; MAX_PACKET_LEN];
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => self.handle_datagram(&buf[..len], peer),
                    Err(e) => error!(error = %e, "Subscription listener receive error"),
                }
            }
        }

        info!("uWSGI subscription listener stopped");
    }

    fn handle_datagram(&self, datagram: &[u8], peer: SocketAddr) {
        match subscription_domain(datagram) {
            Ok(domain) => {
                if self.registry.add(&domain) {
                    info!(domain = %domain, peer = %peer, "Subscribed domain added");
                }
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Dropping subscription packet");
            }
        }
    }
}

/// Extract the subscribed domain from one uWSGI subscription packet.
pub fn subscription_domain(datagram: &[u8]) -> Result<Fqdn, DomainError> {
    let fields = packet::decode(datagram)?;
    let key = fields
        .get(packet::SUBSCRIPTION_KEY)
        .ok_or(DomainError::MissingSubscriptionKey)?;
    let domain = std::str::from_utf8(key).map_err(|_| DomainError::InvalidSubscriptionKey)?;
    Ok(Fqdn::new(domain))
}
