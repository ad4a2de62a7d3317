//! uwsgi-dns infrastructure: wire codecs and socket-facing adapters.
pub mod dns;
pub mod subscription;
