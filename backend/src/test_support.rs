//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for tests and when the `test-support` feature is enabled.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{KeyValueStore, KeyValueStoreError, StoreKey};

/// Clock whose current instant only moves when a test says so.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Key-value store wrapper that fails selected operations by key prefix.
///
/// Everything else is forwarded to the wrapped store. `set_all` is not
/// overridden, so multi-key writes go through the sequential default and can
/// stop half-way.
pub struct FlakyKeyValueStore {
    inner: Arc<dyn KeyValueStore>,
    failing_sets: Vec<String>,
    failing_gets: Vec<String>,
    failing_deletes: Vec<String>,
}

impl FlakyKeyValueStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            failing_sets: Vec::new(),
            failing_gets: Vec::new(),
            failing_deletes: Vec::new(),
        }
    }

    #[must_use]
    pub fn fail_sets_for_prefix(mut self, prefix: &str) -> Self {
        self.failing_sets.push(prefix.to_owned());
        self
    }

    #[must_use]
    pub fn fail_gets_for_prefix(mut self, prefix: &str) -> Self {
        self.failing_gets.push(prefix.to_owned());
        self
    }

    #[must_use]
    pub fn fail_deletes_for_prefix(mut self, prefix: &str) -> Self {
        self.failing_deletes.push(prefix.to_owned());
        self
    }

    fn check(prefixes: &[String], key: &StoreKey, op: &str) -> Result<(), KeyValueStoreError> {
        if prefixes
            .iter()
            .any(|prefix| key.as_str().starts_with(prefix.as_str()))
        {
            return Err(KeyValueStoreError::backend(format!(
                "injected {op} failure for {key}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FlakyKeyValueStore {
    async fn set(
        &self,
        key: &StoreKey,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), KeyValueStoreError> {
        Self::check(&self.failing_sets, key, "set")?;
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>, KeyValueStoreError> {
        Self::check(&self.failing_gets, key, "get")?;
        self.inner.get(key).await
    }

    async fn delete(&self, key: &StoreKey) -> Result<(), KeyValueStoreError> {
        Self::check(&self.failing_deletes, key, "delete")?;
        self.inner.delete(key).await
    }
}
