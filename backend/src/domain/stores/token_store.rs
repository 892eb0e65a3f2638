//! Per-user OAuth token persistence.
//!
//! Refreshing lives in the status resolver, which owns the OAuth provider.

use std::sync::Arc;

use super::{decode_json, encode_json, map_store_error};
use crate::domain::ports::{KeyValueStore, StoreKey};
use crate::domain::{DomainError, OAuthToken, PlatformUserId};

/// Stores one [`OAuthToken`] per platform user under `token-{userId}`.
#[derive(Clone)]
pub struct TokenStore {
    kv: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Create a store over `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Store `token` for `user_id`, replacing any previous token.
    ///
    /// # Errors
    /// [`DomainError::InvalidToken`] when the token lacks credentials;
    /// [`DomainError::Storage`] when the write fails.
    pub async fn put(&self, user_id: &PlatformUserId, token: &OAuthToken) -> Result<(), DomainError> {
        token.validate().map_err(|err| DomainError::InvalidToken {
            message: err.to_string(),
        })?;
        let key = StoreKey::token(user_id);
        let bytes = encode_json(&key, token)?;
        self.kv
            .set(&key, &bytes, None)
            .await
            .map_err(|err| map_store_error(&key, err))
    }

    /// Read the token for `user_id`.
    ///
    /// `Ok(None)` means the user never completed the OAuth flow, which is not
    /// an error.
    pub async fn get(&self, user_id: &PlatformUserId) -> Result<Option<OAuthToken>, DomainError> {
        let key = StoreKey::token(user_id);
        let Some(bytes) = self
            .kv
            .get(&key)
            .await
            .map_err(|err| map_store_error(&key, err))?
        else {
            return Ok(None);
        };
        let token: OAuthToken = decode_json(&key, &bytes)?;
        token
            .validate()
            .map_err(|err| DomainError::storage(format!("stored token for {user_id} is unusable: {err}")))?;
        Ok(Some(token))
    }

    /// Remove the token for `user_id`.
    pub async fn delete(&self, user_id: &PlatformUserId) -> Result<(), DomainError> {
        let key = StoreKey::token(user_id);
        self.kv
            .delete(&key)
            .await
            .map_err(|err| map_store_error(&key, err))
    }
}
