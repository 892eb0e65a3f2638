//! Driven port for the music service's OAuth authorization server.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::{MusicServiceClient, define_port_error};
use crate::domain::OAuthToken;

/// Query parameters delivered to the OAuth redirect endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCallback {
    /// State value issued when the authorization URL was built.
    pub state: String,
    /// One-time authorization code.
    pub code: String,
}

define_port_error! {
    /// Errors surfaced by the OAuth provider adapter.
    pub enum OAuthProviderError {
        /// The provider rejected the grant (bad code, revoked refresh token).
        Rejected { message: String } => "oauth grant rejected: {message}",
        /// Network transport failed or the provider returned a server error.
        Transport { message: String } => "oauth transport failed: {message}",
        /// The token response could not be decoded.
        Decode { message: String } => "oauth response decode failed: {message}",
    }
}

/// Authorization-code flow plus token refresh.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the user visits to grant access; `state` is echoed back.
    fn authorization_url(&self, state: &str) -> Url;

    /// Exchange the callback's authorization code for a token.
    async fn exchange_code(
        &self,
        callback: &AuthorizationCallback,
    ) -> Result<OAuthToken, OAuthProviderError>;

    /// Obtain a fresh access token using the refresh token.
    async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken, OAuthProviderError>;

    /// Music-service client authorised with `token`.
    fn authorized_client(&self, token: &OAuthToken) -> Arc<dyn MusicServiceClient>;
}
