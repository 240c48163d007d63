//! Handoff store
//!
//! Keyed parking spot for values that cross an async boundary: an OAuth
//! state waiting for its callback, or a recommendation result waiting for a
//! poll. Injected as a trait object rather than referenced as shared global
//! state, with a concurrency-safe in-memory map for single-node deployments
//! and a Postgres table when entries must survive restarts.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use database_layer::DatabasePool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] database_layer::DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.into())
    }
}

#[async_trait]
pub trait HandoffStore: Send + Sync {
    /// Store (or replace) the value under the key.
    async fn put(&self, key: Uuid, value: Value) -> Result<(), StoreError>;

    /// Read the value without consuming it; `None` means pending/unknown.
    async fn get(&self, key: Uuid) -> Result<Option<Value>, StoreError>;

    /// Take the value out, returning it if it was present. Single-use
    /// consumers rely on this being the only successful take.
    async fn remove(&self, key: Uuid) -> Result<Option<Value>, StoreError>;
}

/// In-memory backing
#[derive(Debug, Default)]
pub struct MemoryHandoffStore {
    entries: RwLock<HashMap<Uuid, Value>>,
}

impl MemoryHandoffStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HandoffStore for MemoryHandoffStore {
    async fn put(&self, key: Uuid, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key, value);
        Ok(())
    }

    async fn get(&self, key: Uuid) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(&key).cloned())
    }

    async fn remove(&self, key: Uuid) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.write().await.remove(&key))
    }
}

/// Postgres backing over the `handoff_entries` table
#[derive(Debug, Clone)]
pub struct PgHandoffStore {
    pool: DatabasePool,
}

impl PgHandoffStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HandoffStore for PgHandoffStore {
    async fn put(&self, key: Uuid, value: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO handoff_entries (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    async fn get(&self, key: Uuid) -> Result<Option<Value>, StoreError> {
        let value = sqlx::query_scalar::<_, Value>(
            "SELECT value FROM handoff_entries WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(value)
    }

    async fn remove(&self, key: Uuid) -> Result<Option<Value>, StoreError> {
        let value = sqlx::query_scalar::<_, Value>(
            "DELETE FROM handoff_entries WHERE key = $1 RETURNING value",
        )
        .bind(key)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryHandoffStore::new();
        let key = Uuid::new_v4();

        assert!(store.get(key).await.unwrap().is_none());

        store.put(key, json!({"verifier": "abc"})).await.unwrap();
        assert_eq!(
            store.get(key).await.unwrap(),
            Some(json!({"verifier": "abc"}))
        );

        // removal is the single successful take
        assert_eq!(
            store.remove(key).await.unwrap(),
            Some(json!({"verifier": "abc"}))
        );
        assert!(store.remove(key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_put_replaces() {
        let store = MemoryHandoffStore::new();
        let key = Uuid::new_v4();

        store.put(key, json!(1)).await.unwrap();
        store.put(key, json!(2)).await.unwrap();

        assert_eq!(store.get(key).await.unwrap(), Some(json!(2)));
    }
}
