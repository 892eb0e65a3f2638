//! Validated keys and the logical key layout of the key-value store.
use thiserror::Error;

use crate::domain::{ContextKind, ExternalEmail, PlatformUserId};

/// Key addressing one value in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    /// Construct a key after validating that it is non-empty and trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, StoreKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(StoreKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(StoreKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// `token-{userId}`: the user's OAuth token.
    pub fn token(user_id: &PlatformUserId) -> Self {
        Self(format!("token-{user_id}"))
    }

    /// `cached-status-{userId}`: the user's cached playback status.
    pub fn cached_status(user_id: &PlatformUserId) -> Self {
        Self(format!("cached-status-{user_id}"))
    }

    /// `email-{email}`: email to platform user.
    pub fn email(email: &ExternalEmail) -> Self {
        Self(format!("email-{email}"))
    }

    /// `uid-{userId}`: platform user to email.
    pub fn user(user_id: &PlatformUserId) -> Self {
        Self(format!("uid-{user_id}"))
    }

    /// `context-{type}-{id}`: display name of a playback context.
    pub fn context(kind: ContextKind, id: &str) -> Self {
        Self(format!("context-{kind}-{id}"))
    }

    /// `oauth-state-{state}`: pending authorization started by a user.
    pub fn oauth_state(state: &str) -> Self {
        Self(format!("oauth-state-{state}"))
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for StoreKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`StoreKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("store key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("store key must not contain surrounding whitespace")]
    ContainsWhitespace,
}

#[cfg(test)]
mod tests {
    //! Validates key parsing and the logical key layout.
    use super::{StoreKey, StoreKeyValidationError};
    use crate::domain::{ContextKind, ExternalEmail, PlatformUserId};
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn store_key_rejects_blank(#[case] value: &str) {
        let err = StoreKey::new(value).expect_err("blank keys rejected");
        assert_eq!(err, StoreKeyValidationError::Empty);
    }

    #[rstest]
    #[case(" leading")]
    #[case("trailing ")]
    fn store_key_rejects_whitespace_padding(#[case] value: &str) {
        let err = StoreKey::new(value).expect_err("padded key rejected");
        assert_eq!(err, StoreKeyValidationError::ContainsWhitespace);
    }

    #[rstest]
    fn layout_matches_persisted_key_names() {
        let user = PlatformUserId::new("u1").expect("valid id");
        let email = ExternalEmail::new("ada@example.com").expect("valid email");

        assert_eq!(StoreKey::token(&user).as_str(), "token-u1");
        assert_eq!(StoreKey::cached_status(&user).as_str(), "cached-status-u1");
        assert_eq!(StoreKey::email(&email).as_str(), "email-ada@example.com");
        assert_eq!(StoreKey::user(&user).as_str(), "uid-u1");
        assert_eq!(
            StoreKey::context(ContextKind::Playlist, "abc123").as_str(),
            "context-playlist-abc123"
        );
        assert_eq!(StoreKey::oauth_state("s1").as_str(), "oauth-state-s1");
    }
}
