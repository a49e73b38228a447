//! Redis-backed token store.

/// Connection settings and key layout.
pub mod config;
/// Redis error mapping.
pub mod error;
/// The store itself.
pub mod store;

pub use config::RedisConfig;
pub use store::RedisTokenStore;
