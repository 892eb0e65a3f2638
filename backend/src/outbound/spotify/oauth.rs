//! Spotify accounts-service adapter for the authorization-code flow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use reqwest::{Client, StatusCode};
use url::Url;
use zeroize::Zeroizing;

use super::dto::{TokenErrorDto, TokenResponseDto};
use super::{SpotifyHttpClient, body_preview, endpoint};
use crate::domain::OAuthToken;
use crate::domain::ports::{
    AuthorizationCallback, MusicServiceClient, OAuthProvider, OAuthProviderError,
};

/// Scopes needed to read playback state and the account email.
pub const SCOPES: [&str; 3] = [
    "user-read-private",
    "user-read-email",
    "user-read-playback-state",
];

/// Upper bound on the lifetime accepted from a token response.
const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 60 * 60;

/// Registered application credentials.
pub struct SpotifyCredentials {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret, wiped from memory on drop.
    pub client_secret: Zeroizing<String>,
    /// Redirect URL registered with the application.
    pub redirect_url: Url,
}

/// Base URLs of the two Spotify services.
pub struct SpotifyEndpoints {
    /// Accounts service, e.g. `https://accounts.spotify.com/`.
    pub accounts_base: Url,
    /// Web API, e.g. `https://api.spotify.com/v1/`.
    pub api_base: Url,
}

/// OAuth provider that also mints Web API clients.
pub struct SpotifyOAuthProvider {
    client: Client,
    credentials: SpotifyCredentials,
    endpoints: SpotifyEndpoints,
    clock: Arc<dyn Clock>,
}

impl SpotifyOAuthProvider {
    /// Build a provider using a reqwest client with an explicit request
    /// timeout. The same client is shared by every minted API client.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        credentials: SpotifyCredentials,
        endpoints: SpotifyEndpoints,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
            endpoints,
            clock,
        })
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
        previous_refresh_token: Option<&str>,
    ) -> Result<OAuthToken, OAuthProviderError> {
        let url = endpoint(&self.endpoints.accounts_base, &["api", "token"])
            .map_err(OAuthProviderError::transport)?;
        let response = self
            .client
            .post(url)
            .basic_auth(
                self.credentials.client_id.as_str(),
                Some(self.credentials.client_secret.as_str()),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let dto: TokenResponseDto = serde_json::from_slice(body.as_ref()).map_err(|error| {
            OAuthProviderError::decode(format!("invalid token payload: {error}"))
        })?;
        self.token_from_response(dto, previous_refresh_token)
    }

    /// A refresh response may omit the refresh token; the previous one stays
    /// valid in that case.
    fn token_from_response(
        &self,
        dto: TokenResponseDto,
        previous_refresh_token: Option<&str>,
    ) -> Result<OAuthToken, OAuthProviderError> {
        let refresh_token = dto
            .refresh_token
            .filter(|token| !token.trim().is_empty())
            .or_else(|| previous_refresh_token.map(str::to_owned))
            .ok_or_else(|| OAuthProviderError::decode("token response has no refresh token"))?;
        let lifetime = TimeDelta::seconds(dto.expires_in.clamp(0, MAX_EXPIRES_IN_SECS));
        let expiry = self.clock.utc() + lifetime;
        OAuthToken::new(dto.access_token, refresh_token, expiry)
            .map(|token| token.with_token_type(&dto.token_type))
            .map_err(|error| OAuthProviderError::decode(error.to_string()))
    }
}

#[async_trait]
impl OAuthProvider for SpotifyOAuthProvider {
    fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.endpoints.accounts_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("authorize");
        }
        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.credentials.redirect_url.as_str())
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", state);
        url
    }

    async fn exchange_code(
        &self,
        callback: &AuthorizationCallback,
    ) -> Result<OAuthToken, OAuthProviderError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", callback.code.as_str()),
            ("redirect_uri", self.credentials.redirect_url.as_str()),
        ];
        self.request_token(&form, None).await
    }

    async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken, OAuthProviderError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", token.refresh_token()),
        ];
        self.request_token(&form, Some(token.refresh_token())).await
    }

    fn authorized_client(&self, token: &OAuthToken) -> Arc<dyn MusicServiceClient> {
        Arc::new(SpotifyHttpClient::new(
            self.client.clone(),
            self.endpoints.api_base.clone(),
            token.access_token(),
        ))
    }
}

fn map_transport_error(error: reqwest::Error) -> OAuthProviderError {
    OAuthProviderError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> OAuthProviderError {
    if status.is_client_error() {
        let message = match serde_json::from_slice::<TokenErrorDto>(body) {
            Ok(TokenErrorDto {
                error,
                error_description: Some(description),
            }) => format!("{error}: {description}"),
            Ok(TokenErrorDto { error, .. }) => error,
            Err(_) => format!("status {}: {}", status.as_u16(), body_preview(body)),
        };
        return OAuthProviderError::rejected(message);
    }
    OAuthProviderError::transport(format!(
        "status {}: {}",
        status.as_u16(),
        body_preview(body)
    ))
}
