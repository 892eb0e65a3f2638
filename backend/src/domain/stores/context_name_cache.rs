//! Indefinite cache of playback-context display names.
//!
//! Context identity is stable, so names never expire and are never
//! invalidated; a renamed playlist keeps its old name here.

use std::sync::Arc;

use super::{decode_utf8, map_store_error};
use crate::domain::ports::{KeyValueStore, StoreKey};
use crate::domain::{ContextKind, DomainError};

/// Stores names under `context-{type}-{id}` as raw UTF-8.
#[derive(Clone)]
pub struct ContextNameCache {
    kv: Arc<dyn KeyValueStore>,
}

impl ContextNameCache {
    /// Create a cache over `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Cached name for the context, if any.
    pub async fn get(&self, kind: ContextKind, id: &str) -> Result<Option<String>, DomainError> {
        let key = StoreKey::context(kind, id);
        self.kv
            .get(&key)
            .await
            .map_err(|err| map_store_error(&key, err))?
            .map(|bytes| decode_utf8(&key, bytes))
            .transpose()
    }

    /// Record `name` for the context. Last write wins.
    pub async fn put(&self, kind: ContextKind, id: &str, name: &str) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::invalid_input("context name must not be empty"));
        }
        let key = StoreKey::context(kind, id);
        self.kv
            .set(&key, name.as_bytes(), None)
            .await
            .map_err(|err| map_store_error(&key, err))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockable::DefaultClock;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::outbound::kv::InMemoryKeyValueStore;

    #[fixture]
    fn cache() -> ContextNameCache {
        ContextNameCache::new(Arc::new(InMemoryKeyValueStore::new(Arc::new(DefaultClock))))
    }

    #[rstest]
    #[tokio::test]
    async fn put_then_get_round_trips(cache: ContextNameCache) {
        cache
            .put(ContextKind::Playlist, "abc123", "Focus Mix")
            .await
            .expect("put succeeds");
        assert_eq!(
            cache.get(ContextKind::Playlist, "abc123").await.expect("get succeeds"),
            Some("Focus Mix".to_owned())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn last_write_wins(cache: ContextNameCache) {
        cache.put(ContextKind::Album, "a1", "Old").await.expect("put succeeds");
        cache.put(ContextKind::Album, "a1", "New").await.expect("put succeeds");
        assert_eq!(
            cache.get(ContextKind::Album, "a1").await.expect("get succeeds"),
            Some("New".to_owned())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn kinds_do_not_share_entries(cache: ContextNameCache) {
        cache.put(ContextKind::Artist, "x", "Artist X").await.expect("put succeeds");
        assert_eq!(
            cache.get(ContextKind::Show, "x").await.expect("get succeeds"),
            None
        );
    }

    #[rstest]
    #[tokio::test]
    async fn blank_names_are_rejected(cache: ContextNameCache) {
        let err = cache
            .put(ContextKind::Show, "s1", "  ")
            .await
            .expect_err("blank name rejected");
        assert!(matches!(err, DomainError::InvalidInput { .. }));
    }
}
