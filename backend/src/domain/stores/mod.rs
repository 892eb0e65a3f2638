//! Typed stores layered over the [`KeyValueStore`] port.
//!
//! Each store owns one slice of the key layout and the encoding of its
//! values. Every mutation is a full overwrite, so concurrent writers can
//! race without corrupting a record; the last write wins.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use crate::domain::DomainError;
use crate::domain::ports::{KeyValueStore, KeyValueStoreError, StoreKey};

mod authorization_state;
mod context_name_cache;
mod identity_mapping;
mod status_cache;
mod token_store;

pub use authorization_state::{AUTHORIZATION_STATE_TTL, AuthorizationStateStore};
pub use context_name_cache::ContextNameCache;
pub use identity_mapping::IdentityMappingStore;
pub use status_cache::{StatusCache, StatusCacheLookup};
pub use token_store::TokenStore;

/// All typed stores sharing one key-value backend.
#[derive(Clone)]
pub struct StoreSet {
    /// Bidirectional platform user ↔ email mapping.
    pub identities: IdentityMappingStore,
    /// OAuth tokens per platform user.
    pub tokens: TokenStore,
    /// Display names of playback contexts.
    pub context_names: ContextNameCache,
    /// Short-lived playback statuses.
    pub statuses: StatusCache,
    /// Pending OAuth authorizations.
    pub authorizations: AuthorizationStateStore,
}

impl StoreSet {
    /// Build every store over `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let tokens = TokenStore::new(kv.clone());
        let statuses = StatusCache::new(kv.clone());
        Self {
            identities: IdentityMappingStore::new(kv.clone(), tokens.clone(), statuses.clone()),
            tokens,
            context_names: ContextNameCache::new(kv.clone()),
            statuses,
            authorizations: AuthorizationStateStore::new(kv),
        }
    }
}

fn map_store_error(key: &StoreKey, error: KeyValueStoreError) -> DomainError {
    DomainError::storage(format!("{key}: {error}"))
}

fn encode_json<T: Serialize>(key: &StoreKey, value: &T) -> Result<Vec<u8>, DomainError> {
    serde_json::to_vec(value)
        .map_err(|err| DomainError::storage(format!("failed to encode {key}: {err}")))
}

fn decode_json<T: DeserializeOwned>(key: &StoreKey, bytes: &[u8]) -> Result<T, DomainError> {
    serde_json::from_slice(bytes)
        .map_err(|err| DomainError::storage(format!("failed to decode {key}: {err}")))
}

fn decode_utf8(key: &StoreKey, bytes: Vec<u8>) -> Result<String, DomainError> {
    String::from_utf8(bytes)
        .map_err(|err| DomainError::storage(format!("{key} is not valid UTF-8: {err}")))
}
