use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uwsgi_dns_application::ports::SubscriptionSource;
use uwsgi_dns_application::DomainRegistry;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Background job that keeps the domain registry in step with the
/// supervisor's stats endpoint.
///
/// Every cycle fetches a full subscription snapshot and replaces the
/// registry wholesale. The first poll fires immediately at startup; after
/// that the interval ticks regardless of outcome, so a refused connection
/// or a bad snapshot simply means the registry stays as it was until the
/// next attempt.
pub struct SubscriptionSyncJob {
    registry: Arc<DomainRegistry>,
    source: Arc<dyn SubscriptionSource>,
    interval_secs: u64,
    refresh: Arc<Notify>,
    shutdown: CancellationToken,
}

impl SubscriptionSyncJob {
    pub fn new(registry: Arc<DomainRegistry>, source: Arc<dyn SubscriptionSource>) -> Self {
        Self {
            registry,
            source,
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            refresh: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Handle for forcing a poll outside the regular cadence (signal
    /// handlers use this).
    pub fn refresh_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.refresh)
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_secs = self.interval_secs,
            "Starting subscription sync job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("SubscriptionSyncJob: shutting down");
                        break;
                    }
                    _ = self.refresh.notified() => {
                        info!("SubscriptionSyncJob: refresh requested");
                        self.poll_once().await;
                    }
                    _ = interval.tick() => {
                        self.poll_once().await;
                    }
                }
            }
        });
    }

    async fn poll_once(&self) {
        match self.source.fetch_subscriptions().await {
            Ok(domains) => {
                let count = domains.len();
                if self.registry.replace(domains) {
                    info!(count, "Subscription snapshot applied");
                }
            }
            Err(e) => {
                error!(error = %e, "Subscription poll failed, registry unchanged");
            }
        }
    }
}
