//! Domain primitives, services and ports.
//!
//! Purpose: Define the strongly typed listening-status model and the services
//! that resolve and cache it. Keep types immutable and document invariants
//! and serialisation contracts (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - PlatformUserId / ExternalEmail: the two sides of the identity mapping.
//! - OAuthToken: a user's access/refresh token pair with its expiry.
//! - ContextKind / PlaybackContextReference / PlaybackStatus: what a user is
//!   listening to and how it is displayed.
//! - DomainError / ErrorCode: failures reported by the services.
//! - StatusResolver / ConnectionService: the driving entry points.

pub mod configuration;
pub mod connection_service;
pub mod context_resolution;
pub mod error;
pub mod identity;
pub mod playback;
pub mod ports;
pub mod status_resolver;
pub mod stores;
pub mod token;

pub use self::configuration::{
    ActiveConfiguration, ConfigurationHandle, DEFAULT_NEGATIVE_STATUS_TTL, DEFAULT_STATUS_TTL,
    ResolverPolicy,
};
pub use self::connection_service::ConnectionService;
pub use self::context_resolution::{
    ContextResolutionError, PLAYLIST_TITLE_SUFFIX, extract_page_title,
};
pub use self::error::{DomainError, ErrorCode};
pub use self::identity::{ExternalEmail, IdentityValidationError, PlatformUserId};
pub use self::playback::{
    ContextKind, ContextParseError, PlaybackContextReference, PlaybackStatus,
};
pub use self::status_resolver::StatusResolver;
pub use self::stores::StoreSet;
pub use self::token::{OAuthToken, REFRESH_MARGIN, TokenValidationError};
