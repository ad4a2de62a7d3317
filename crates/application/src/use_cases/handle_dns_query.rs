use crate::ports::UpstreamForwarder;
use crate::registry::DomainRegistry;
use std::sync::Arc;
use tracing::debug;
use uwsgi_dns_domain::{DomainError, Fqdn, Transport};

/// One inbound DNS question, as seen by the decision logic.
pub struct DnsRequest<'a> {
    pub name: Fqdn,
    pub transport: Transport,
    /// The query exactly as it arrived on the wire (no TCP length prefix).
    pub raw: &'a [u8],
}

/// What the server should do with a query.
#[derive(Debug)]
pub enum QueryOutcome {
    /// The name is subscribed; answer from the localhost template.
    Local,
    /// The upstream's response, to be relayed unmodified.
    Proxied(Vec<u8>),
}

/// Decides local-answer vs. proxy vs. drop for every inbound query.
///
/// Holds the registry read and the upstream round trip strictly apart: the
/// lock is released before any network call starts.
pub struct HandleDnsQueryUseCase {
    registry: Arc<DomainRegistry>,
    upstream: Option<Arc<dyn UpstreamForwarder>>,
}

impl HandleDnsQueryUseCase {
    pub fn new(registry: Arc<DomainRegistry>, upstream: Option<Arc<dyn UpstreamForwarder>>) -> Self {
        Self { registry, upstream }
    }

    pub async fn execute(&self, request: &DnsRequest<'_>) -> Result<QueryOutcome, DomainError> {
        if self.registry.contains(&request.name) {
            debug!(domain = %request.name, "Resolving subscribed domain to localhost");
            return Ok(QueryOutcome::Local);
        }

        match &self.upstream {
            Some(upstream) => {
                debug!(
                    domain = %request.name,
                    transport = %request.transport,
                    "Proxying query to upstream"
                );
                let reply = upstream.forward(request.raw, request.transport).await?;
                Ok(QueryOutcome::Proxied(reply))
            }
            None => Err(DomainError::NotLocalNoProxy(request.name.to_string())),
        }
    }
}
