//! Session cache backends.
//!
//! # Responsibilities
//! - Load, persist and destroy session records by opaque identifier
//! - Apply the configured time-to-live on every save
//!
//! # Design Decisions
//! - One trait, two backends: redis for deployments, in-memory for tests
//!   and local development without a cache server
//! - Records are stored as JSON strings; a corrupt record is an error, not
//!   a silent logout, so operators see it in the logs

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tokio::sync::RwLock;

use crate::session::SessionData;

/// Error type for session cache access.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("corrupt session record: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Storage backend for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<SessionData>, StoreError>;
    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> Result<(), StoreError>;
    async fn destroy(&self, id: &str) -> Result<(), StoreError>;
}

/// Redis-backed session store.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: &'static str,
}

impl RedisSessionStore {
    /// Connect to the session cache. The connection manager reconnects on
    /// its own; individual commands fail fast instead of queueing forever.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager_with_config(config).await?;

        Ok(Self {
            conn,
            prefix: "sess:",
        })
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.key(id)).await?;
        Ok(match raw {
            Some(payload) => Some(serde_json::from_str(&payload)?),
            None => None,
        })
    }

    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> Result<(), StoreError> {
        let payload = serde_json::to_string(data)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(self.key(id), payload, ttl.as_secs()).await?;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(id)).await?;
        Ok(())
    }
}

/// In-memory session store for tests and cache-less development.
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, (SessionData, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(id).and_then(|(data, expires)| {
            if Instant::now() < *expires {
                Some(data.clone())
            } else {
                None
            }
        }))
    }

    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(id.to_string(), (data.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemorySessionStore::new();
        let data = SessionData {
            user: Some(Identity::new(1, "alice")),
            csrf_secret: None,
        };

        store
            .save("abc", &data, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.load("abc").await.unwrap(), Some(data));

        store.destroy("abc").await.unwrap();
        assert_eq!(store.load("abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_expires_records() {
        let store = MemorySessionStore::new();
        store
            .save("abc", &SessionData::default(), Duration::from_secs(0))
            .await
            .unwrap();
        assert_eq!(store.load("abc").await.unwrap(), None);
    }
}
