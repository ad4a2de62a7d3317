use async_trait::async_trait;
use uwsgi_dns_domain::{DomainError, Transport};

/// Forwards a raw DNS query to the configured upstream server and returns
/// the raw response bytes.
///
/// The query is relayed verbatim over the transport it arrived on; the
/// implementation owns the round-trip timeout.
#[async_trait]
pub trait UpstreamForwarder: Send + Sync {
    async fn forward(&self, query: &[u8], transport: Transport) -> Result<Vec<u8>, DomainError>;
}
