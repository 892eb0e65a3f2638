//! Domain-level error taxonomy.
//!
//! These errors are transport agnostic. Callers that expose the services over
//! HTTP or a slash command map [`ErrorCode`] onto their own envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ExternalEmail, PlatformUserId};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The caller is not permitted to complete the operation.
    Forbidden,
    /// The requested record does not exist.
    NotFound,
    /// An upstream dependency is unavailable; retrying later may help.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Errors returned by the identity, connection, and status services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// No OAuth client credentials are loaded; resolution fails closed.
    #[error("music service is not configured")]
    NotConfigured,
    /// The music-service account's email has no registered platform user.
    #[error("no registration found for {email}")]
    NoRegistration { email: ExternalEmail },
    /// The two directions of the identity mapping disagree.
    #[error("invalid identity mapping for user {user_id}")]
    InvalidMapping { user_id: PlatformUserId },
    /// Only part of a multi-key identity write was applied.
    #[error("identity mapping partially written: {message}")]
    InconsistentMapping { message: String },
    /// The OAuth state parameter is unknown or already used.
    #[error("authorization state is unknown or expired")]
    InvalidState,
    /// A lookup found nothing.
    #[error("{what} not found")]
    NotFound { what: String },
    /// Caller input failed validation.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    /// A token was missing required credentials.
    #[error("invalid token: {message}")]
    InvalidToken { message: String },
    /// The provider refused the authorization code.
    #[error("authorization failed: {message}")]
    AuthorizationFailed { message: String },
    /// Refreshing a near-expiry token failed; the stale token is not used.
    #[error("token refresh failed: {message}")]
    TokenRefreshFailed { message: String },
    /// The music service could not answer.
    #[error("music service unavailable: {message}")]
    UpstreamUnavailable { message: String },
    /// The key-value store failed.
    #[error("storage failure: {message}")]
    Storage { message: String },
}

impl DomainError {
    /// Stable code for inbound adapters.
    ///
    /// # Examples
    /// ```
    /// use listening_status::domain::{DomainError, ErrorCode};
    ///
    /// assert_eq!(DomainError::NotConfigured.code(), ErrorCode::ServiceUnavailable);
    /// assert_eq!(DomainError::InvalidState.code(), ErrorCode::Forbidden);
    /// ```
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput { .. } | Self::InvalidToken { .. } => ErrorCode::InvalidRequest,
            Self::NoRegistration { .. }
            | Self::InvalidMapping { .. }
            | Self::InvalidState
            | Self::AuthorizationFailed { .. } => ErrorCode::Forbidden,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::NotConfigured
            | Self::TokenRefreshFailed { .. }
            | Self::UpstreamUnavailable { .. } => ErrorCode::ServiceUnavailable,
            Self::InconsistentMapping { .. } | Self::Storage { .. } => ErrorCode::InternalError,
        }
    }

    /// Helper for lookups that found nothing.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper for validation failures.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Helper for store failures.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Helper for upstream failures.
    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }
}
