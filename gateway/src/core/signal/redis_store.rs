use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use super::base::{SignalStore, StoreError, StoreResult};

/// Redis-backed signal store shared by every gateway instance.
///
/// Keys are the bare session id so other services reading the same Redis
/// see the same tokens.
#[derive(Clone)]
pub struct RedisSignalStore {
    connection: MultiplexedConnection,
    ttl_seconds: u64,
}

impl RedisSignalStore {
    pub async fn connect(url: &str, ttl: Duration) -> StoreResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!("Connected to Redis signal store");

        Ok(Self {
            connection,
            ttl_seconds: ttl.as_secs().max(1),
        })
    }
}

#[async_trait]
impl SignalStore for RedisSignalStore {
    async fn get(&self, session_id: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<String>>(session_id)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))
    }

    async fn set(&self, session_id: &str, token: &str) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(session_id, token, self.ttl_seconds)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))
    }
}
