use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::base::{SignalStore, StoreResult};

const MAX_ENTRIES: u64 = 100_000;

/// In-process signal store.
///
/// Only correct when the streaming session and the end-of-call webhook hit
/// the same instance; use the Redis store behind a load balancer.
#[derive(Clone)]
pub struct MemorySignalStore {
    entries: Cache<String, String>,
}

impl MemorySignalStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn get(&self, session_id: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(session_id).await)
    }

    async fn set(&self, session_id: &str, token: &str) -> StoreResult<()> {
        self.entries
            .insert(session_id.to_string(), token.to_string())
            .await;
        Ok(())
    }
}
