use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::subscription::SubscriptionConfig;
use super::upstream::UpstreamConfig;

/// Main configuration for uwsgi-dns.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// DNS listening endpoint.
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream proxying.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// uWSGI subscription ingestion (push listener + stats poller).
    #[serde(default)]
    pub subscription: SubscriptionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults.
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. uwsgi-dns.toml in the current directory
    /// 3. /etc/uwsgi-dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("uwsgi-dns.toml").exists() {
            Self::from_file("uwsgi-dns.toml")?
        } else if std::path::Path::new("/etc/uwsgi-dns/config.toml").exists() {
            Self::from_file("/etc/uwsgi-dns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.dns_port {
            self.server.port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if overrides.proxy {
            self.upstream.proxy = true;
        }
        if let Some(upstream) = overrides.upstream {
            self.upstream.server = upstream;
        }
        if let Some(stats) = overrides.stats {
            self.subscription.stats_addr = stats;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }
        if self.subscription.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "Subscription poll interval cannot be 0".to_string(),
            ));
        }
        self.subscription.stats_host_port()?;
        if self.upstream.proxy {
            self.upstream.host_port()?;
        }
        Ok(())
    }
}

/// Command-line overrides for configuration.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub proxy: bool,
    pub upstream: Option<String>,
    pub stats: Option<String>,
    pub log_level: Option<String>,
}
