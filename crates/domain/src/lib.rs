//! uwsgi-dns domain layer: core types shared by every other crate.
pub mod config;
pub mod errors;
pub mod fqdn;
pub mod transport;

pub use config::{CliOverrides, Config};
pub use errors::DomainError;
pub use fqdn::Fqdn;
pub use transport::Transport;
