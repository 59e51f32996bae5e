//! Cache implementations - in-memory by default, Redis when enabled.

mod memory;

pub use memory::InMemoryCache;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisCache, RedisConfig};
