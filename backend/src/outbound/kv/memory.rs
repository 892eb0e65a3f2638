//! Process-local key-value store with clock-driven expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{KeyValueStore, KeyValueStoreError, StoreKey};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Mutex-guarded map honouring per-key TTLs against an injected clock.
///
/// Expired entries read as absent and are dropped lazily. `set_all` applies
/// every entry under one lock, so it is atomic.
pub struct InMemoryKeyValueStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKeyValueStore {
    /// Create an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, KeyValueStoreError> {
        self.entries
            .lock()
            .map_err(|_| KeyValueStoreError::backend("in-memory store mutex poisoned"))
    }

    fn expiry(&self, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
        ttl.map(|ttl| {
            let delta = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
            self.clock
                .utc()
                .checked_add_signed(delta)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn set(
        &self,
        key: &StoreKey,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), KeyValueStoreError> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: self.expiry(ttl),
        };
        self.lock()?.insert(key.as_str().to_owned(), entry);
        Ok(())
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>, KeyValueStoreError> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        match entries.get(key.as_str()) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &StoreKey) -> Result<(), KeyValueStoreError> {
        self.lock()?.remove(key.as_str());
        Ok(())
    }

    async fn set_all(&self, entries: &[(StoreKey, Vec<u8>)]) -> Result<(), KeyValueStoreError> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert(
                key.as_str().to_owned(),
                Entry {
                    value: value.clone(),
                    expires_at: None,
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::MutableClock;

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        Arc::new(MutableClock::new(
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0)
                .single()
                .expect("valid time"),
        ))
    }

    fn key(raw: &str) -> StoreKey {
        StoreKey::new(raw).expect("valid key")
    }

    #[rstest]
    #[tokio::test]
    async fn absent_key_reads_as_none() {
        let store = InMemoryKeyValueStore::new(Arc::new(DefaultClock));
        assert_eq!(store.get(&key("missing")).await.expect("get"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn ttl_expires_on_the_boundary(clock: Arc<MutableClock>) {
        let store = InMemoryKeyValueStore::new(clock.clone());
        store
            .set(&key("k"), b"v", Some(Duration::from_secs(10)))
            .await
            .expect("set");

        clock.advance(Duration::from_secs(9));
        assert_eq!(store.get(&key("k")).await.expect("get"), Some(b"v".to_vec()));

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get(&key("k")).await.expect("get"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn entries_without_ttl_never_expire(clock: Arc<MutableClock>) {
        let store = InMemoryKeyValueStore::new(clock.clone());
        store.set(&key("k"), b"v", None).await.expect("set");
        clock.advance(Duration::from_secs(60 * 60 * 24 * 365));
        assert_eq!(store.get(&key("k")).await.expect("get"), Some(b"v".to_vec()));
    }

    #[rstest]
    #[tokio::test]
    async fn overwrite_replaces_value_and_ttl(clock: Arc<MutableClock>) {
        let store = InMemoryKeyValueStore::new(clock.clone());
        store
            .set(&key("k"), b"old", Some(Duration::from_secs(5)))
            .await
            .expect("set");
        store.set(&key("k"), b"new", None).await.expect("set");
        clock.advance(Duration::from_secs(30));
        assert_eq!(store.get(&key("k")).await.expect("get"), Some(b"new".to_vec()));
    }

    #[rstest]
    #[tokio::test]
    async fn set_all_writes_every_entry_and_delete_is_idempotent(clock: Arc<MutableClock>) {
        let store = InMemoryKeyValueStore::new(clock);
        store
            .set_all(&[(key("a"), b"1".to_vec()), (key("b"), b"2".to_vec())])
            .await
            .expect("set_all");
        assert_eq!(store.get(&key("a")).await.expect("get"), Some(b"1".to_vec()));
        assert_eq!(store.get(&key("b")).await.expect("get"), Some(b"2".to_vec()));

        store.delete(&key("a")).await.expect("delete");
        store.delete(&key("a")).await.expect("second delete");
        assert_eq!(store.get(&key("a")).await.expect("get"), None);
    }
}
