//! OAuth token lease owned by exactly one platform user.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tokens expiring sooner than this are refreshed before use.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60 + 30);

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Validation errors raised when constructing an [`OAuthToken`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenValidationError {
    /// The access token was blank.
    #[error("access token must not be empty")]
    EmptyAccessToken,
    /// The refresh token was blank.
    #[error("refresh token must not be empty")]
    EmptyRefreshToken,
}

/// Access/refresh token pair with its expiry.
///
/// The serialised form mirrors the usual OAuth2 token JSON
/// (`access_token`, `token_type`, `refresh_token`, `expiry`) so stored values
/// stay readable by other tooling. `Debug` redacts both secrets.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    refresh_token: String,
    expiry: DateTime<Utc>,
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_owned()
}

impl OAuthToken {
    /// Validate and construct a bearer token.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use listening_status::domain::OAuthToken;
    ///
    /// let expiry = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().expect("valid time");
    /// let token = OAuthToken::new("access", "refresh", expiry).expect("valid token");
    /// assert_eq!(token.access_token(), "access");
    /// ```
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expiry: DateTime<Utc>,
    ) -> Result<Self, TokenValidationError> {
        let token = Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: refresh_token.into(),
            expiry,
        };
        token.validate()?;
        Ok(token)
    }

    /// Replace the token type; blank values keep `Bearer`.
    #[must_use]
    pub fn with_token_type(mut self, token_type: &str) -> Self {
        let trimmed = token_type.trim();
        if !trimmed.is_empty() {
            self.token_type = trimmed.to_owned();
        }
        self
    }

    /// Check the invariants that deserialised tokens must also satisfy.
    pub fn validate(&self) -> Result<(), TokenValidationError> {
        if self.access_token.trim().is_empty() {
            return Err(TokenValidationError::EmptyAccessToken);
        }
        if self.refresh_token.trim().is_empty() {
            return Err(TokenValidationError::EmptyRefreshToken);
        }
        Ok(())
    }

    /// Bearer credential presented to the music service.
    pub fn access_token(&self) -> &str {
        self.access_token.as_str()
    }

    /// Credential exchanged for a new access token.
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.as_str()
    }

    /// Token type reported by the provider, usually `Bearer`.
    pub fn token_type(&self) -> &str {
        self.token_type.as_str()
    }

    /// Instant after which the access token is no longer accepted.
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// Whether fewer than `margin` remain before expiry at `now`.
    ///
    /// Already-expired tokens always report `true`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let threshold = TimeDelta::from_std(margin).unwrap_or(TimeDelta::MAX);
        self.expiry.signed_duration_since(now) < threshold
    }
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("refresh_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}
