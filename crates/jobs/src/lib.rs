//! uwsgi-dns background jobs.
pub mod subscription_sync;

pub use subscription_sync::SubscriptionSyncJob;
