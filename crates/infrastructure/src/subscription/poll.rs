use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::debug;
use uwsgi_dns_application::ports::SubscriptionSource;
use uwsgi_dns_domain::{DomainError, Fqdn};

/// Client for the uWSGI fastrouter stats endpoint.
///
/// One poll is a full connect/read/disconnect cycle: the endpoint writes a
/// single JSON document and closes the connection, so the snapshot is read
/// to EOF. No connection is kept between polls.
pub struct StatsClient {
    host: String,
    port: u16,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct StatsSnapshot {
    subscriptions: Vec<SubscriptionEntry>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEntry {
    key: String,
}

impl StatsClient {
    pub fn new(host: String, port: u16, timeout: Duration) -> Self {
        Self {
            host,
            port,
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Fetch the full set of currently subscribed domains.
    pub async fn fetch_subscriptions(&self) -> Result<FxHashSet<Fqdn>, DomainError> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let mut stream = tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| DomainError::SubscriptionConnectFailure {
                endpoint: self.endpoint(),
                reason: "connect timeout".to_string(),
            })?
            .map_err(|e| DomainError::SubscriptionConnectFailure {
                endpoint: self.endpoint(),
                reason: e.to_string(),
            })?;

        let mut body = Vec::new();
        tokio::time::timeout(self.timeout, stream.read_to_end(&mut body))
            .await
            .map_err(|_| {
                DomainError::SubscriptionParseFailure("timeout reading snapshot".to_string())
            })?
            .map_err(|e| {
                DomainError::SubscriptionParseFailure(format!("reading snapshot: {e}"))
            })?;

        let snapshot: StatsSnapshot = serde_json::from_slice(&body)
            .map_err(|e| DomainError::SubscriptionParseFailure(e.to_string()))?;

        let domains: FxHashSet<Fqdn> = snapshot
            .subscriptions
            .into_iter()
            .map(|entry| Fqdn::new(&entry.key))
            .collect();

        debug!(
            endpoint = %self.endpoint(),
            count = domains.len(),
            "Fetched subscription snapshot"
        );
        Ok(domains)
    }
}

#[async_trait]
impl SubscriptionSource for StatsClient {
    async fn fetch_subscriptions(&self) -> Result<FxHashSet<Fqdn>, DomainError> {
        StatsClient::fetch_subscriptions(self).await
    }
}
