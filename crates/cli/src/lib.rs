//! uwsgi-dns binary internals, exposed as a library so integration tests
//! can drive the real server loops.
pub mod bootstrap;
pub mod di;
pub mod server;
