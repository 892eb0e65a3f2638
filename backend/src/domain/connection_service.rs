//! Connecting and disconnecting a platform user's music-service account.
//!
//! A user first registers the email of their music-service account, then
//! follows the authorization URL. The callback is accepted only when the
//! account's email maps back to the same user who started the flow.

use std::sync::Arc;

use tracing::{error, info, warn};
use url::Url;

use super::configuration::ConfigurationHandle;
use super::ports::{AuthorizationCallback, OAuthProvider};
use super::stores::{
    AuthorizationStateStore, IdentityMappingStore, StatusCache, StoreSet, TokenStore,
};
use super::{DomainError, ExternalEmail, OAuthToken, PlatformUserId};

/// Drives registration, the OAuth authorization-code flow and disconnect.
#[derive(Clone)]
pub struct ConnectionService {
    configuration: Arc<ConfigurationHandle>,
    identities: IdentityMappingStore,
    tokens: TokenStore,
    statuses: StatusCache,
    authorizations: AuthorizationStateStore,
}

impl ConnectionService {
    /// Build the service over the shared stores.
    pub fn new(configuration: Arc<ConfigurationHandle>, stores: &StoreSet) -> Self {
        Self {
            configuration,
            identities: stores.identities.clone(),
            tokens: stores.tokens.clone(),
            statuses: stores.statuses.clone(),
            authorizations: stores.authorizations.clone(),
        }
    }

    /// Record that `user_id` owns the music-service account `email`.
    pub async fn register_email(
        &self,
        user_id: &PlatformUserId,
        email: &ExternalEmail,
    ) -> Result<(), DomainError> {
        self.identities.register(user_id, email).await
    }

    /// Start the authorization flow for `user_id`.
    ///
    /// # Errors
    /// [`DomainError::NotConfigured`] without OAuth credentials;
    /// [`DomainError::Storage`] when the state cannot be recorded.
    pub async fn authorization_url(&self, user_id: &PlatformUserId) -> Result<Url, DomainError> {
        let config = self.configuration.snapshot();
        let oauth = config.oauth.as_deref().ok_or(DomainError::NotConfigured)?;
        let state = self.authorizations.issue(user_id).await?;
        info!(user_id = %user_id, "issued authorization url");
        Ok(oauth.authorization_url(&state))
    }

    /// Finish the flow started by [`Self::authorization_url`].
    ///
    /// Returns the platform user the token was stored for.
    ///
    /// # Errors
    /// - [`DomainError::NotConfigured`] without OAuth credentials.
    /// - [`DomainError::InvalidState`] for an unknown, used or expired state.
    /// - [`DomainError::AuthorizationFailed`] when the code exchange or the
    ///   profile lookup fails.
    /// - [`DomainError::NoRegistration`] when no user registered the
    ///   account's email.
    /// - [`DomainError::InvalidMapping`] when the mapping does not point back
    ///   to the account's email and the user who started the flow.
    pub async fn complete_authorization(
        &self,
        callback: &AuthorizationCallback,
    ) -> Result<PlatformUserId, DomainError> {
        let config = self.configuration.snapshot();
        let oauth = config.oauth.as_deref().ok_or(DomainError::NotConfigured)?;

        let Some(initiator) = self.authorizations.consume(&callback.state).await? else {
            warn!("authorization callback with unknown state");
            return Err(DomainError::InvalidState);
        };

        let token = oauth.exchange_code(callback).await.map_err(|err| {
            warn!(user_id = %initiator, error = %err, kind = err.kind(), "code exchange failed");
            DomainError::AuthorizationFailed {
                message: err.to_string(),
            }
        })?;
        let email = account_email(oauth, &token, &initiator).await?;

        let user_id = match self.identities.lookup_user_by_email(&email).await {
            Ok(user_id) => user_id,
            Err(DomainError::NotFound { .. }) => {
                warn!(email = %email, "no registration for authorized account");
                return Err(DomainError::NoRegistration { email });
            }
            Err(err) => return Err(err),
        };
        self.verify_mapping(&user_id, &email, &initiator).await?;

        self.tokens.put(&user_id, &token).await?;
        if let Err(err) = self.statuses.invalidate(&user_id).await {
            warn!(user_id = %user_id, error = %err, "failed to invalidate cached status");
        }
        info!(user_id = %user_id, email = %email, "music service connected");
        Ok(user_id)
    }

    /// Remove the user's mapping, token and cached status.
    pub async fn disconnect(&self, user_id: &PlatformUserId) -> Result<(), DomainError> {
        self.identities.clear(user_id).await
    }

    async fn verify_mapping(
        &self,
        user_id: &PlatformUserId,
        email: &ExternalEmail,
        initiator: &PlatformUserId,
    ) -> Result<(), DomainError> {
        let reverse = match self.identities.lookup_email_by_user(user_id).await {
            Ok(reverse) => Some(reverse),
            Err(DomainError::NotFound { .. }) => None,
            Err(err) => return Err(err),
        };
        if reverse.as_ref() != Some(email) {
            error!(
                user_id = %user_id,
                email = %email,
                reverse = reverse.as_ref().map(ExternalEmail::as_str),
                "identity mapping is not symmetric"
            );
            return Err(DomainError::InvalidMapping {
                user_id: user_id.clone(),
            });
        }
        if user_id != initiator {
            error!(
                user_id = %user_id,
                initiator = %initiator,
                "authorized account is registered to a different user"
            );
            return Err(DomainError::InvalidMapping {
                user_id: user_id.clone(),
            });
        }
        Ok(())
    }
}

async fn account_email(
    oauth: &dyn OAuthProvider,
    token: &OAuthToken,
    initiator: &PlatformUserId,
) -> Result<ExternalEmail, DomainError> {
    let account = oauth
        .authorized_client(token)
        .current_user()
        .await
        .map_err(|err| {
            warn!(user_id = %initiator, error = %err, "profile lookup failed");
            DomainError::AuthorizationFailed {
                message: err.to_string(),
            }
        })?;
    ExternalEmail::new(&account.email).map_err(|err| DomainError::AuthorizationFailed {
        message: format!("account email unusable: {err}"),
    })
}

#[cfg(test)]
#[path = "connection_service_tests.rs"]
mod tests;
