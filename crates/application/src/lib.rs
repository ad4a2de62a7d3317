//! uwsgi-dns application layer: the domain registry, the upstream port,
//! and the query decision logic.
pub mod ports;
pub mod registry;
pub mod use_cases;

pub use registry::DomainRegistry;
