//! Driven port for the music-service Web API, acting as one authorised user.
//!
//! The domain owns the response shapes so the resolver stays independent of
//! the upstream JSON layout.

use async_trait::async_trait;

use super::define_port_error;

/// Raw playback context as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackContextPayload {
    /// Context type, e.g. `playlist`.
    pub kind: String,
    /// Opaque URI such as `spotify:playlist:<id>`.
    pub uri: String,
    /// Public web page for the context.
    pub external_url: Option<String>,
}

/// Current playback state of the authorised user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPlayback {
    /// Whether audio is playing right now.
    pub is_playing: bool,
    /// Context the playback runs from; absent for ad-hoc queues.
    pub context: Option<PlaybackContextPayload>,
}

/// Artist metadata used for naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistMetadata {
    /// Artist name.
    pub name: String,
}

/// Playlist metadata used for naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistMetadata {
    /// Playlist title.
    pub name: String,
}

/// Album metadata used for naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumMetadata {
    /// Album title.
    pub name: String,
    /// Credited artist names, primary artist first.
    pub artists: Vec<String>,
}

/// Show metadata used for naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowMetadata {
    /// Show title.
    pub name: String,
}

/// Profile of the authorised account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAccount {
    /// Email registered with the music service.
    pub email: String,
}

define_port_error! {
    /// Errors surfaced while calling the music service.
    pub enum MusicServiceError {
        /// The resource does not exist or is not visible to this token.
        NotFound { message: String } => "music service resource not found: {message}",
        /// The access token was rejected.
        Unauthorized { message: String } => "music service rejected credentials: {message}",
        /// The service rate-limited the request.
        RateLimited { message: String } => "music service rate limited request: {message}",
        /// Network transport failed or the service returned a server error.
        Transport { message: String } => "music service transport failed: {message}",
        /// The response could not be decoded.
        Decode { message: String } => "music service response decode failed: {message}",
    }
}

/// Read-only music-service operations for one authorised user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MusicServiceClient: Send + Sync {
    /// Current playback, or `None` when no device is active.
    async fn current_playback(&self) -> Result<Option<CurrentPlayback>, MusicServiceError>;

    /// Artist metadata by id.
    async fn artist(&self, id: &str) -> Result<ArtistMetadata, MusicServiceError>;

    /// Playlist metadata by id.
    async fn playlist(&self, id: &str) -> Result<PlaylistMetadata, MusicServiceError>;

    /// Album metadata by id.
    async fn album(&self, id: &str) -> Result<AlbumMetadata, MusicServiceError>;

    /// Show metadata by id.
    async fn show(&self, id: &str) -> Result<ShowMetadata, MusicServiceError>;

    /// Profile of the account that owns the token.
    async fn current_user(&self) -> Result<ExternalAccount, MusicServiceError>;
}
