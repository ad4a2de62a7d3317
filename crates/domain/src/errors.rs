use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Malformed subscription packet: {0}")]
    MalformedPacket(String),

    #[error("Subscription packet has no key field")]
    MissingSubscriptionKey,

    #[error("Subscription key is not valid UTF-8")]
    InvalidSubscriptionKey,

    #[error("Failed to connect to subscription stats server {endpoint}: {reason}")]
    SubscriptionConnectFailure { endpoint: String, reason: String },

    #[error("Failed to parse subscription stats snapshot: {0}")]
    SubscriptionParseFailure(String),

    #[error("{0} is not a local domain and upstream proxying is disabled")]
    NotLocalNoProxy(String),

    #[error("Upstream query failed: {0}")]
    UpstreamFailure(String),

    #[error("Timeout waiting for upstream {server}")]
    UpstreamTimeout { server: String },

    #[error("I/O error: {0}")]
    IoError(String),
}
