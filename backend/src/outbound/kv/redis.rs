//! Redis-backed key-value store using a `bb8` connection pool.
//!
//! Values are stored as raw bytes. TTLs map to `SET ... EX` with whole
//! seconds (rounded up, minimum one); multi-key writes run as a `MULTI/EXEC`
//! pipeline.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection};
use bb8_redis::redis;
use tracing::debug;

use crate::domain::ports::{KeyValueStore, KeyValueStoreError, StoreKey};

/// Pooled Redis adapter for [`KeyValueStore`].
#[derive(Clone)]
pub struct RedisKeyValueStore {
    pool: Pool<RedisConnectionManager>,
}

impl RedisKeyValueStore {
    /// Wrap an existing pool.
    pub fn new(pool: Pool<RedisConnectionManager>) -> Self {
        Self { pool }
    }

    /// Build a pool for `redis_url` and wrap it.
    ///
    /// # Errors
    /// [`KeyValueStoreError::Backend`] when the URL is invalid or no
    /// connection can be established.
    pub async fn connect(redis_url: &str) -> Result<Self, KeyValueStoreError> {
        let manager = RedisConnectionManager::new(redis_url).map_err(map_redis_error)?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .map_err(map_redis_error)?;
        debug!("redis key-value store connected");
        Ok(Self::new(pool))
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>, KeyValueStoreError> {
        self.pool
            .get()
            .await
            .map_err(|err| KeyValueStoreError::backend(format!("redis pool: {err}")))
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

fn map_redis_error(error: redis::RedisError) -> KeyValueStoreError {
    KeyValueStoreError::backend(format!("redis: {error}"))
}

fn set_command(key: &StoreKey, value: &[u8], ttl: Option<Duration>) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key.as_str()).arg(value);
    if let Some(ttl) = ttl {
        cmd.arg("EX").arg(ttl_seconds(ttl));
    }
    cmd
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn set(
        &self,
        key: &StoreKey,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), KeyValueStoreError> {
        let mut conn = self.connection().await?;
        set_command(key, value, ttl)
            .query_async::<()>(&mut *conn)
            .await
            .map_err(map_redis_error)
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>, KeyValueStoreError> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(key.as_str())
            .query_async::<Option<Vec<u8>>>(&mut *conn)
            .await
            .map_err(map_redis_error)
    }

    async fn delete(&self, key: &StoreKey) -> Result<(), KeyValueStoreError> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(key.as_str())
            .query_async::<()>(&mut *conn)
            .await
            .map_err(map_redis_error)
    }

    async fn set_all(&self, entries: &[(StoreKey, Vec<u8>)]) -> Result<(), KeyValueStoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.add_command(set_command(key, value, None)).ignore();
        }
        let mut conn = self.connection().await?;
        pipe.query_async::<()>(&mut *conn)
            .await
            .map_err(map_redis_error)
    }
}
