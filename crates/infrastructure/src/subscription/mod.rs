pub mod listener;
pub mod packet;
pub mod poll;

pub use listener::SubscriptionListener;
pub use poll::StatsClient;
