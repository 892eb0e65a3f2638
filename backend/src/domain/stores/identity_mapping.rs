//! Bidirectional platform user ↔ external email mapping.
//!
//! The two directions live under `email-{email}` and `uid-{userId}` and are
//! written together through [`KeyValueStore::set_all`]. Whether that write is
//! atomic depends on the adapter; a partial write is surfaced as
//! [`DomainError::InconsistentMapping`] and is not rolled back.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{StatusCache, TokenStore, decode_utf8, map_store_error};
use crate::domain::ports::{KeyValueStore, KeyValueStoreError, StoreKey};
use crate::domain::{DomainError, ExternalEmail, PlatformUserId};

/// Sole owner of the identity mapping.
#[derive(Clone)]
pub struct IdentityMappingStore {
    kv: Arc<dyn KeyValueStore>,
    tokens: TokenStore,
    statuses: StatusCache,
}

impl IdentityMappingStore {
    /// Create a store over `kv`; `tokens` and `statuses` receive the cascade
    /// performed by [`Self::clear`].
    pub fn new(kv: Arc<dyn KeyValueStore>, tokens: TokenStore, statuses: StatusCache) -> Self {
        Self {
            kv,
            tokens,
            statuses,
        }
    }

    /// Map `user_id` and `email` to each other.
    ///
    /// Re-registering a user with a new address drops the old
    /// `email-{previous}` entry once the new pair is written. When `email`
    /// belonged to another user, that user loses the mapping together with
    /// their token and cached status, so the address maps to one user in
    /// both directions.
    ///
    /// # Errors
    /// [`DomainError::InconsistentMapping`] when only one direction landed
    /// or the previous owner's entries could not be removed;
    /// [`DomainError::Storage`] for other store failures.
    pub async fn register(
        &self,
        user_id: &PlatformUserId,
        email: &ExternalEmail,
    ) -> Result<(), DomainError> {
        let previous_email = self.find_email(user_id).await?;
        let previous_owner = self
            .find_user(email)
            .await?
            .filter(|owner| owner != user_id);

        let email_key = StoreKey::email(email);
        let entries = [
            (email_key.clone(), user_id.as_str().as_bytes().to_vec()),
            (StoreKey::user(user_id), email.as_str().as_bytes().to_vec()),
        ];
        match self.kv.set_all(&entries).await {
            Ok(()) => {}
            Err(KeyValueStoreError::Partial { written, message }) => {
                error!(
                    user_id = %user_id,
                    email = %email,
                    written,
                    error = %message,
                    "identity mapping partially written"
                );
                return Err(DomainError::InconsistentMapping {
                    message: format!("{written} of 2 entries written for user {user_id}: {message}"),
                });
            }
            Err(err) => return Err(map_store_error(&email_key, err)),
        }

        if let Some(previous) = previous_email.filter(|previous| previous != email) {
            if let Err(err) = self.delete_email_if_owned(&previous, user_id).await {
                warn!(email = %previous, error = %err, "failed to drop superseded email mapping");
            }
        }

        if let Some(owner) = previous_owner {
            self.evict_previous_owner(&owner, email).await?;
        }

        info!(user_id = %user_id, email = %email, "registered identity mapping");
        Ok(())
    }

    /// Platform user registered for `email`.
    ///
    /// # Errors
    /// [`DomainError::NotFound`] when no user registered the address.
    pub async fn lookup_user_by_email(
        &self,
        email: &ExternalEmail,
    ) -> Result<PlatformUserId, DomainError> {
        self.find_user(email)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user for email {email}")))
    }

    /// Email registered by `user_id`.
    ///
    /// # Errors
    /// [`DomainError::NotFound`] when the user has not registered.
    pub async fn lookup_email_by_user(
        &self,
        user_id: &PlatformUserId,
    ) -> Result<ExternalEmail, DomainError> {
        self.find_email(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("email for user {user_id}")))
    }

    /// Remove both directions of the mapping, then the user's token and
    /// cached status.
    ///
    /// Every delete is attempted even when an earlier one fails; the first
    /// failure is returned.
    pub async fn clear(&self, user_id: &PlatformUserId) -> Result<(), DomainError> {
        let mut first_error: Option<DomainError> = None;
        let mut record = |result: Result<(), DomainError>, what: &'static str| {
            if let Err(err) = result {
                warn!(user_id = %user_id, error = %err, what, "failed to clear user data");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        };

        match self.find_email(user_id).await {
            Ok(Some(email)) => {
                record(self.delete_email_if_owned(&email, user_id).await, "email mapping");
            }
            Ok(None) => {}
            Err(err) => record(Err(err), "email lookup"),
        }

        let user_key = StoreKey::user(user_id);
        let result = self
            .kv
            .delete(&user_key)
            .await
            .map_err(|err| map_store_error(&user_key, err));
        record(result, "user mapping");
        record(self.tokens.delete(user_id).await, "token");
        record(self.statuses.invalidate(user_id).await, "cached status");

        match first_error {
            Some(err) => Err(err),
            None => {
                info!(user_id = %user_id, "cleared user integration data");
                Ok(())
            }
        }
    }

    /// Delete `email-{email}` unless another user has since taken it over.
    async fn delete_email_if_owned(
        &self,
        email: &ExternalEmail,
        user_id: &PlatformUserId,
    ) -> Result<(), DomainError> {
        match self.find_user(email).await? {
            Some(owner) if &owner == user_id => {
                let key = StoreKey::email(email);
                self.kv
                    .delete(&key)
                    .await
                    .map_err(|err| map_store_error(&key, err))
            }
            Some(owner) => {
                debug!(email = %email, owner = %owner, "email now owned by another user; kept");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Drop `previous_owner`'s side of a mapping `email` was taken from.
    ///
    /// Their token was granted for the account behind `email`, so it goes
    /// too, along with the status it produced.
    async fn evict_previous_owner(
        &self,
        previous_owner: &PlatformUserId,
        email: &ExternalEmail,
    ) -> Result<(), DomainError> {
        warn!(
            previous_owner = %previous_owner,
            email = %email,
            "email re-registered by another user; evicting previous owner"
        );
        if self.find_email(previous_owner).await?.as_ref() != Some(email) {
            return Ok(());
        }

        let user_key = StoreKey::user(previous_owner);
        let evicted = async {
            self.kv
                .delete(&user_key)
                .await
                .map_err(|err| map_store_error(&user_key, err))?;
            self.tokens.delete(previous_owner).await?;
            self.statuses.invalidate(previous_owner).await
        }
        .await;
        evicted.map_err(|err| {
            error!(
                previous_owner = %previous_owner,
                email = %email,
                error = %err,
                "failed to evict previous owner of email"
            );
            DomainError::InconsistentMapping {
                message: format!("{user_key} still points at {email}: {err}"),
            }
        })
    }

    async fn find_user(&self, email: &ExternalEmail) -> Result<Option<PlatformUserId>, DomainError> {
        let key = StoreKey::email(email);
        let Some(bytes) = self
            .kv
            .get(&key)
            .await
            .map_err(|err| map_store_error(&key, err))?
        else {
            return Ok(None);
        };
        let raw = decode_utf8(&key, bytes)?;
        PlatformUserId::new(raw)
            .map(Some)
            .map_err(|err| DomainError::storage(format!("{key} holds an invalid user id: {err}")))
    }

    async fn find_email(
        &self,
        user_id: &PlatformUserId,
    ) -> Result<Option<ExternalEmail>, DomainError> {
        let key = StoreKey::user(user_id);
        let Some(bytes) = self
            .kv
            .get(&key)
            .await
            .map_err(|err| map_store_error(&key, err))?
        else {
            return Ok(None);
        };
        let raw = decode_utf8(&key, bytes)?;
        ExternalEmail::new(raw)
            .map(Some)
            .map_err(|err| DomainError::storage(format!("{key} holds an invalid email: {err}")))
    }
}
