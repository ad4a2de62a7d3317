use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uwsgi_dns_application::ports::UpstreamForwarder;
use uwsgi_dns_application::use_cases::HandleDnsQueryUseCase;
use uwsgi_dns_application::DomainRegistry;
use uwsgi_dns_domain::config::ConfigError;
use uwsgi_dns_domain::Config;
use uwsgi_dns_infrastructure::dns::{LocalAnswerTemplate, ProxyForwarder};
use uwsgi_dns_infrastructure::subscription::StatsClient;

/// Everything the query path needs: the shared registry, the decision use
/// case, and the localhost answer template.
pub struct DnsServices {
    pub registry: Arc<DomainRegistry>,
    pub use_case: Arc<HandleDnsQueryUseCase>,
    pub template: Arc<LocalAnswerTemplate>,
}

impl DnsServices {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let registry = Arc::new(DomainRegistry::new());

        let upstream: Option<Arc<dyn UpstreamForwarder>> = if config.upstream.proxy {
            let (host, port) = config.upstream.host_port()?;
            info!(server = %config.upstream.server, "Upstream proxying enabled");
            Some(Arc::new(ProxyForwarder::new(
                host,
                port,
                Duration::from_millis(config.upstream.timeout_ms),
            )))
        } else {
            info!("Upstream proxying disabled; queries for unsubscribed domains are dropped");
            None
        };

        let use_case = Arc::new(HandleDnsQueryUseCase::new(Arc::clone(&registry), upstream));

        Ok(Self {
            registry,
            use_case,
            template: Arc::new(LocalAnswerTemplate::new()),
        })
    }
}

/// Client side of the subscription ingestion: the stats endpoint poller.
pub struct SubscriptionServices {
    pub stats: Arc<StatsClient>,
}

impl SubscriptionServices {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let (host, port) = config.subscription.stats_host_port()?;
        Ok(Self {
            stats: Arc::new(StatsClient::new(
                host,
                port,
                Duration::from_millis(config.subscription.connect_timeout_ms),
            )),
        })
    }
}
