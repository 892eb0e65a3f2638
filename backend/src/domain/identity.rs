//! Identity primitives shared by the stores and services.
//!
//! Both identifiers end up embedded in store keys, so construction rejects
//! blank values and surrounding whitespace.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors returned when constructing identity values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityValidationError {
    /// The platform user identifier was blank.
    #[error("platform user id must not be empty")]
    EmptyUserId,
    /// The platform user identifier contained whitespace.
    #[error("platform user id must not contain whitespace")]
    UserIdContainsWhitespace,
    /// The email address was blank.
    #[error("email must not be empty")]
    EmptyEmail,
    /// The email address was not of the form `local@domain`.
    #[error("email must contain a single '@' with non-empty local and domain parts")]
    MalformedEmail,
}

/// Identity of a user on the collaboration platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformUserId(String);

impl PlatformUserId {
    /// Validate and construct a [`PlatformUserId`].
    ///
    /// # Examples
    /// ```
    /// use listening_status::domain::PlatformUserId;
    ///
    /// let id = PlatformUserId::new("u7x9k2").expect("valid id");
    /// assert_eq!(id.as_str(), "u7x9k2");
    /// assert!(PlatformUserId::new("  ").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(IdentityValidationError::EmptyUserId);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(IdentityValidationError::UserIdContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PlatformUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for PlatformUserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<PlatformUserId> for String {
    fn from(value: PlatformUserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for PlatformUserId {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address of the external music-service account.
///
/// ## Invariants
/// - Trimmed and lower-cased, so the same account always maps to the same
///   store key regardless of how the user typed it.
/// - Exactly one `@` with non-empty parts on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalEmail(String);

impl ExternalEmail {
    /// Validate, normalise, and construct an [`ExternalEmail`].
    ///
    /// # Examples
    /// ```
    /// use listening_status::domain::ExternalEmail;
    ///
    /// let email = ExternalEmail::new(" Ada@Example.com ").expect("valid email");
    /// assert_eq!(email.as_str(), "ada@example.com");
    /// ```
    pub fn new(value: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        let normalized = value.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(IdentityValidationError::EmptyEmail);
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(IdentityValidationError::MalformedEmail);
        }
        match normalized.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(normalized))
            }
            _ => Err(IdentityValidationError::MalformedEmail),
        }
    }

    /// Borrow the address as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ExternalEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ExternalEmail> for String {
    fn from(value: ExternalEmail) -> Self {
        value.0
    }
}

impl TryFrom<String> for ExternalEmail {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
