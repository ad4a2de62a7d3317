mod errors;
mod hostport;
mod logging;
mod root;
mod server;
mod subscription;
mod upstream;

pub use errors::ConfigError;
pub use hostport::parse_host_port;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use subscription::SubscriptionConfig;
pub use upstream::UpstreamConfig;
