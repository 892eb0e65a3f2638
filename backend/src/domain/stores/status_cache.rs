//! Short-TTL cache of display-ready playback statuses.

use std::sync::Arc;
use std::time::Duration;

use super::{decode_json, encode_json, map_store_error};
use crate::domain::ports::{KeyValueStore, StoreKey};
use crate::domain::{DomainError, PlatformUserId, PlaybackStatus};

/// Outcome of reading the status cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCacheLookup {
    /// Nothing cached, or the entry expired: resolve fresh.
    Miss,
    /// A negative entry: the last resolution produced no status.
    Unavailable,
    /// A cached status.
    Status(PlaybackStatus),
}

/// Stores one status per user under `cached-status-{userId}` with a TTL.
///
/// Values are JSON; a negative entry is stored as `null`.
#[derive(Clone)]
pub struct StatusCache {
    kv: Arc<dyn KeyValueStore>,
}

impl StatusCache {
    /// Create a cache over `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Read the cached entry for `user_id`.
    pub async fn get(&self, user_id: &PlatformUserId) -> Result<StatusCacheLookup, DomainError> {
        let key = StoreKey::cached_status(user_id);
        let bytes = self
            .kv
            .get(&key)
            .await
            .map_err(|err| map_store_error(&key, err))?;
        let Some(bytes) = bytes else {
            return Ok(StatusCacheLookup::Miss);
        };
        let entry: Option<PlaybackStatus> = decode_json(&key, &bytes)?;
        Ok(entry.map_or(StatusCacheLookup::Unavailable, StatusCacheLookup::Status))
    }

    /// Cache `status` for `ttl`; `None` writes a negative entry.
    pub async fn put(
        &self,
        user_id: &PlatformUserId,
        status: Option<&PlaybackStatus>,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        let key = StoreKey::cached_status(user_id);
        let bytes = encode_json(&key, &status)?;
        self.kv
            .set(&key, &bytes, Some(ttl))
            .await
            .map_err(|err| map_store_error(&key, err))
    }

    /// Drop the entry so the next read resolves fresh.
    pub async fn invalidate(&self, user_id: &PlatformUserId) -> Result<(), DomainError> {
        let key = StoreKey::cached_status(user_id);
        self.kv
            .delete(&key)
            .await
            .map_err(|err| map_store_error(&key, err))
    }
}
