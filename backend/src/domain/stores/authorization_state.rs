//! Pending OAuth authorizations keyed by their `state` parameter.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use super::{decode_utf8, map_store_error};
use crate::domain::ports::{KeyValueStore, StoreKey};
use crate::domain::{DomainError, PlatformUserId};

/// How long a user has to finish the provider's consent screen.
pub const AUTHORIZATION_STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// Single-use `oauth-state-{state} → userId` entries.
#[derive(Clone)]
pub struct AuthorizationStateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl AuthorizationStateStore {
    /// Create a store over `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Issue a fresh random state bound to `user_id`.
    pub async fn issue(&self, user_id: &PlatformUserId) -> Result<String, DomainError> {
        let state = Uuid::new_v4().simple().to_string();
        let key = StoreKey::oauth_state(&state);
        self.kv
            .set(&key, user_id.as_str().as_bytes(), Some(AUTHORIZATION_STATE_TTL))
            .await
            .map_err(|err| map_store_error(&key, err))?;
        Ok(state)
    }

    /// Take the user bound to `state`, removing the entry.
    ///
    /// `Ok(None)` when the state was never issued, already used or expired.
    pub async fn consume(&self, state: &str) -> Result<Option<PlatformUserId>, DomainError> {
        if state.trim().is_empty() {
            return Ok(None);
        }
        let key = StoreKey::oauth_state(state);
        let Some(bytes) = self
            .kv
            .get(&key)
            .await
            .map_err(|err| map_store_error(&key, err))?
        else {
            return Ok(None);
        };
        if let Err(err) = self.kv.delete(&key).await {
            warn!(key = %key, error = %err, "failed to remove used authorization state");
        }
        let raw = decode_utf8(&key, bytes)?;
        PlatformUserId::new(raw)
            .map(Some)
            .map_err(|err| DomainError::storage(format!("{key} holds an invalid user id: {err}")))
    }
}
