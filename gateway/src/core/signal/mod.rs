//! Post-call signalling between the media stream and the end-of-call webhook.
//!
//! The streaming session and the end-of-call request are independent HTTP
//! exchanges, possibly served by different instances. A [`SignalStore`] maps
//! a session id to a small disposition token so the streaming side can tell
//! the webhook to hang up instead of transferring.

mod base;
mod memory;
#[cfg(feature = "redis-store")]
mod redis_store;

use std::sync::Arc;
use std::time::Duration;

pub use base::{Disposition, SignalStore, StoreError, StoreResult};
pub use memory::MemorySignalStore;
#[cfg(feature = "redis-store")]
pub use redis_store::RedisSignalStore;

/// Build the store selected by `url`.
///
/// `None` and `memory://` give an in-process store; `redis://` and
/// `rediss://` need the `redis-store` feature.
pub async fn create_signal_store(
    url: Option<&str>,
    ttl: Duration,
) -> StoreResult<Arc<dyn SignalStore>> {
    match url {
        None => Ok(Arc::new(MemorySignalStore::new(ttl))),
        Some(url) if url.starts_with("memory://") => Ok(Arc::new(MemorySignalStore::new(ttl))),
        Some(url) if url.starts_with("redis://") || url.starts_with("rediss://") => {
            connect_redis(url, ttl).await
        }
        Some(url) => Err(StoreError::Unsupported(format!(
            "unsupported signal store url: {url}"
        ))),
    }
}

#[cfg(feature = "redis-store")]
async fn connect_redis(url: &str, ttl: Duration) -> StoreResult<Arc<dyn SignalStore>> {
    Ok(Arc::new(RedisSignalStore::connect(url, ttl).await?))
}

#[cfg(not(feature = "redis-store"))]
async fn connect_redis(_url: &str, _ttl: Duration) -> StoreResult<Arc<dyn SignalStore>> {
    Err(StoreError::Unsupported(
        "redis signal store requires the `redis-store` feature".to_string(),
    ))
}
