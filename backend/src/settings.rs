//! Service configuration loaded via OrthoConfig.
//!
//! Every field can be set through `LISTENING_STATUS_*` environment
//! variables. OAuth credentials are optional as a group: without them the
//! service runs unconfigured and every resolution fails closed.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::ResolverPolicy;
use crate::outbound::spotify::{DEFAULT_ACCOUNTS_BASE_URL, DEFAULT_API_BASE_URL};

/// Configuration values for status resolution and the Spotify integration.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LISTENING_STATUS")]
pub struct StatusSettings {
    /// Spotify application client id.
    pub client_id: Option<String>,
    /// Spotify application client secret.
    pub client_secret: Option<String>,
    /// Redirect URL registered with the Spotify application.
    pub redirect_url: Option<String>,
    /// Redis connection URL; the in-memory store is used when unset.
    pub redis_url: Option<String>,
    /// Lifetime of resolved statuses, in seconds.
    #[ortho_config(default = 900)]
    pub status_ttl_seconds: u64,
    /// Lifetime of "not connected" and nameless statuses, in seconds.
    #[ortho_config(default = 300)]
    pub negative_status_ttl_seconds: u64,
    /// Per-request timeout for outbound HTTP calls, in seconds.
    #[ortho_config(default = 10)]
    pub http_timeout_seconds: u64,
    /// Override for the Web API base URL.
    pub api_base_url: Option<String>,
    /// Override for the accounts service base URL.
    pub accounts_base_url: Option<String>,
}

/// Problems found while interpreting [`StatusSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Some but not all OAuth credentials were provided.
    #[error("incomplete OAuth configuration: missing {missing}")]
    IncompleteCredentials { missing: &'static str },
    /// A URL setting could not be parsed.
    #[error("invalid {field}: {message}")]
    InvalidUrl { field: &'static str, message: String },
    /// A duration setting was zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
}

/// OAuth settings after validation.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// Spotify application client id.
    pub client_id: String,
    /// Spotify application client secret.
    pub client_secret: Zeroizing<String>,
    /// Redirect URL registered with the application.
    pub redirect_url: Url,
    /// Accounts service base.
    pub accounts_base: Url,
    /// Web API base.
    pub api_base: Url,
}

impl StatusSettings {
    /// Cache lifetimes for the resolver.
    ///
    /// # Errors
    /// [`SettingsError::ZeroDuration`] when either TTL is zero.
    pub fn policy(&self) -> Result<ResolverPolicy, SettingsError> {
        Ok(ResolverPolicy {
            status_ttl: positive_seconds("status_ttl_seconds", self.status_ttl_seconds)?,
            negative_status_ttl: positive_seconds(
                "negative_status_ttl_seconds",
                self.negative_status_ttl_seconds,
            )?,
        })
    }

    /// Timeout applied to each outbound HTTP request.
    pub fn http_timeout(&self) -> Result<Duration, SettingsError> {
        positive_seconds("http_timeout_seconds", self.http_timeout_seconds)
    }

    /// Validated OAuth settings; `Ok(None)` when no credential is set.
    ///
    /// # Errors
    /// [`SettingsError::IncompleteCredentials`] when only some of
    /// `client_id`, `client_secret` and `redirect_url` are set;
    /// [`SettingsError::InvalidUrl`] for malformed URLs.
    pub fn oauth(&self) -> Result<Option<OAuthSettings>, SettingsError> {
        let client_id = non_blank(self.client_id.as_deref());
        let client_secret = non_blank(self.client_secret.as_deref());
        let redirect_url = non_blank(self.redirect_url.as_deref());

        let (client_id, client_secret, redirect_url) =
            match (client_id, client_secret, redirect_url) {
                (None, None, None) => return Ok(None),
                (Some(id), Some(secret), Some(redirect)) => (id, secret, redirect),
                (None, _, _) => return Err(incomplete("client_id")),
                (_, None, _) => return Err(incomplete("client_secret")),
                (_, _, None) => return Err(incomplete("redirect_url")),
            };

        Ok(Some(OAuthSettings {
            client_id: client_id.to_owned(),
            client_secret: Zeroizing::new(client_secret.to_owned()),
            redirect_url: parse_url("redirect_url", redirect_url)?,
            accounts_base: parse_url(
                "accounts_base_url",
                non_blank(self.accounts_base_url.as_deref()).unwrap_or(DEFAULT_ACCOUNTS_BASE_URL),
            )?,
            api_base: parse_url(
                "api_base_url",
                non_blank(self.api_base_url.as_deref()).unwrap_or(DEFAULT_API_BASE_URL),
            )?,
        }))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn incomplete(missing: &'static str) -> SettingsError {
    SettingsError::IncompleteCredentials { missing }
}

fn positive_seconds(field: &'static str, seconds: u64) -> Result<Duration, SettingsError> {
    if seconds == 0 {
        return Err(SettingsError::ZeroDuration { field });
    }
    Ok(Duration::from_secs(seconds))
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|err| SettingsError::InvalidUrl {
        field,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 9] = [
        "LISTENING_STATUS_CLIENT_ID",
        "LISTENING_STATUS_CLIENT_SECRET",
        "LISTENING_STATUS_REDIRECT_URL",
        "LISTENING_STATUS_REDIS_URL",
        "LISTENING_STATUS_STATUS_TTL_SECONDS",
        "LISTENING_STATUS_NEGATIVE_STATUS_TTL_SECONDS",
        "LISTENING_STATUS_HTTP_TIMEOUT_SECONDS",
        "LISTENING_STATUS_API_BASE_URL",
        "LISTENING_STATUS_ACCOUNTS_BASE_URL",
    ];

    fn load_from_empty_args() -> StatusSettings {
        StatusSettings::load_from_iter([OsString::from("listening-status")])
            .expect("config should load")
    }

    fn env_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(settings.policy(), Ok(ResolverPolicy::default()));
        assert_eq!(settings.http_timeout(), Ok(Duration::from_secs(10)));
        assert!(settings.redis_url.is_none());
        assert!(settings.oauth().expect("valid").is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("LISTENING_STATUS_CLIENT_ID", "client-123"),
            ("LISTENING_STATUS_CLIENT_SECRET", "s3cret"),
            (
                "LISTENING_STATUS_REDIRECT_URL",
                "https://chat.example.com/callback",
            ),
            ("LISTENING_STATUS_STATUS_TTL_SECONDS", "60"),
            ("LISTENING_STATUS_NEGATIVE_STATUS_TTL_SECONDS", "15"),
            ("LISTENING_STATUS_API_BASE_URL", "http://127.0.0.1:9000/v1/"),
        ]));

        let settings = load_from_empty_args();
        let policy = settings.policy().expect("valid policy");
        assert_eq!(policy.status_ttl, Duration::from_secs(60));
        assert_eq!(policy.negative_status_ttl, Duration::from_secs(15));

        let oauth = settings.oauth().expect("valid").expect("configured");
        assert_eq!(oauth.client_id, "client-123");
        assert_eq!(oauth.client_secret.as_str(), "s3cret");
        assert_eq!(oauth.api_base.as_str(), "http://127.0.0.1:9000/v1/");
        assert_eq!(oauth.accounts_base.as_str(), DEFAULT_ACCOUNTS_BASE_URL);
    }

    #[rstest]
    #[case(&[("LISTENING_STATUS_CLIENT_ID", "client-123")], "client_secret")]
    #[case(
        &[("LISTENING_STATUS_CLIENT_ID", "id"), ("LISTENING_STATUS_CLIENT_SECRET", "secret")],
        "redirect_url"
    )]
    #[case(&[("LISTENING_STATUS_CLIENT_SECRET", "secret")], "client_id")]
    fn partial_credentials_are_rejected(
        #[case] overrides: &[(&str, &str)],
        #[case] missing: &'static str,
    ) {
        let _guard = lock_env(env_with(overrides));

        let err = load_from_empty_args().oauth().expect_err("incomplete");
        assert_eq!(err, SettingsError::IncompleteCredentials { missing });
    }

    #[rstest]
    fn zero_ttl_is_rejected() {
        let _guard = lock_env(env_with(&[("LISTENING_STATUS_STATUS_TTL_SECONDS", "0")]));

        assert_eq!(
            load_from_empty_args().policy(),
            Err(SettingsError::ZeroDuration {
                field: "status_ttl_seconds"
            })
        );
    }
}
