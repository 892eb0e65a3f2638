//! Port for the generic key-value store every other store is built on.
use std::time::Duration;

use async_trait::async_trait;

use super::{StoreKey, define_port_error};

define_port_error! {
    /// Errors surfaced by key-value store adapters.
    pub enum KeyValueStoreError {
        /// Backend is unavailable, timing out, or rejected the command.
        Backend { message: String } => "key-value store backend failure: {message}",
        /// A multi-key write stopped after `written` entries were applied.
        Partial { written: usize, message: String } =>
            "key-value store applied only {written} entries: {message}",
    }
}

/// Get/set/delete with optional per-key expiry.
///
/// `get` distinguishes absence (`Ok(None)`) from failure (`Err`). Expired
/// values are reported as absent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn set(
        &self,
        key: &StoreKey,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), KeyValueStoreError>;

    /// Read the value stored under `key`.
    async fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>, KeyValueStoreError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &StoreKey) -> Result<(), KeyValueStoreError>;

    /// Store several non-expiring entries.
    ///
    /// The default writes one key at a time and is not atomic: when a later
    /// write fails, the earlier ones stay applied and
    /// [`KeyValueStoreError::Partial`] reports how many landed. Adapters with
    /// transactional writes override this.
    async fn set_all(&self, entries: &[(StoreKey, Vec<u8>)]) -> Result<(), KeyValueStoreError> {
        for (written, (key, value)) in entries.iter().enumerate() {
            if let Err(error) = self.set(key, value, None).await {
                if written == 0 {
                    return Err(error);
                }
                return Err(KeyValueStoreError::partial(written, error.to_string()));
            }
        }
        Ok(())
    }
}
