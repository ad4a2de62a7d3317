use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::hostport::parse_host_port;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionConfig {
    /// uWSGI fastrouter stats endpoint, `host[:port]`; a bare host uses
    /// port 80.
    #[serde(default = "default_stats_addr")]
    pub stats_addr: String,

    /// Seconds between stats snapshots, and between retries after a
    /// failed poll.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Local address the subscription push listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Bound on connecting to and reading from the stats endpoint.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl SubscriptionConfig {
    pub fn stats_host_port(&self) -> Result<(String, u16), ConfigError> {
        parse_host_port(&self.stats_addr, 80)
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            stats_addr: default_stats_addr(),
            poll_interval_secs: default_poll_interval_secs(),
            listen_addr: default_listen_addr(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_stats_addr() -> String {
    "127.0.0.1:5004".to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_listen_addr() -> String {
    "127.0.0.1:9696".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}
