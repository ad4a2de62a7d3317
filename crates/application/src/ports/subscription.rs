use async_trait::async_trait;
use rustc_hash::FxHashSet;
use uwsgi_dns_domain::{DomainError, Fqdn};

/// Fetches the full set of currently subscribed domains from the process
/// supervisor, one snapshot per call.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    async fn fetch_subscriptions(&self) -> Result<FxHashSet<Fqdn>, DomainError>;
}
