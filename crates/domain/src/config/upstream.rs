use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::hostport::parse_host_port;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Forward queries for non-subscribed domains instead of dropping them.
    #[serde(default = "default_false")]
    pub proxy: bool,

    /// Upstream DNS server, `host[:port]`; a bare host uses port 53.
    #[serde(default = "default_server")]
    pub server: String,

    /// Bound on every proxy round trip (connect, send, receive).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl UpstreamConfig {
    pub fn host_port(&self) -> Result<(String, u16), ConfigError> {
        parse_host_port(&self.server, 53)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            proxy: false,
            server: default_server(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_false() -> bool {
    false
}

fn default_server() -> String {
    "8.8.8.8:53".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}
