//! Playback context references and the display-ready status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of entity a playback session is running from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// An artist page or radio.
    Artist,
    /// A user or editorial playlist.
    Playlist,
    /// An album.
    Album,
    /// A podcast show.
    Show,
}

impl ContextKind {
    /// Lower-case name used by the upstream API and in store keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Playlist => "playlist",
            Self::Album => "album",
            Self::Show => "show",
        }
    }

    /// Capitalised name shown to other users.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Artist => "Artist",
            Self::Playlist => "Playlist",
            Self::Album => "Album",
            Self::Show => "Show",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextKind {
    type Err = ContextParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "artist" => Ok(Self::Artist),
            "playlist" => Ok(Self::Playlist),
            "album" => Ok(Self::Album),
            "show" => Ok(Self::Show),
            other => Err(ContextParseError::UnsupportedKind {
                kind: other.to_owned(),
            }),
        }
    }
}

/// Reasons a playback context could not be turned into a reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextParseError {
    /// The context type is not one the resolver knows how to name.
    #[error("unsupported context type '{kind}'")]
    UnsupportedKind { kind: String },
    /// The URI did not carry an identifier in its third segment.
    #[error("context uri '{uri}' has no identifier segment")]
    MissingIdentifier { uri: String },
}

/// Transient reference to the entity currently being played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackContextReference {
    kind: ContextKind,
    id: String,
    external_url: Option<String>,
}

impl PlaybackContextReference {
    /// Build a reference from the raw type and URI reported upstream.
    ///
    /// The identifier is the third colon-delimited segment of the URI
    /// (`service:playlist:<id>`).
    ///
    /// # Examples
    /// ```
    /// use listening_status::domain::{ContextKind, PlaybackContextReference};
    ///
    /// let reference = PlaybackContextReference::parse(
    ///     "playlist",
    ///     "spotify:playlist:37i9dQZF1DX0XUsuxWHRQd",
    ///     Some("https://open.spotify.com/playlist/37i9dQZF1DX0XUsuxWHRQd".to_owned()),
    /// )
    /// .expect("valid context");
    /// assert_eq!(reference.kind(), ContextKind::Playlist);
    /// assert_eq!(reference.id(), "37i9dQZF1DX0XUsuxWHRQd");
    /// ```
    pub fn parse(
        kind: &str,
        uri: &str,
        external_url: Option<String>,
    ) -> Result<Self, ContextParseError> {
        let kind = kind.parse::<ContextKind>()?;
        let id = uri
            .split(':')
            .nth(2)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| ContextParseError::MissingIdentifier {
                uri: uri.to_owned(),
            })?;
        Ok(Self {
            kind,
            id: id.to_owned(),
            external_url: external_url.filter(|url| !url.trim().is_empty()),
        })
    }

    /// Entity kind.
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Upstream identifier of the entity.
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Public web page for the entity, when the service reported one.
    pub fn external_url(&self) -> Option<&str> {
        self.external_url.as_deref()
    }
}

/// Display-ready listening status cached per user.
///
/// Carries no credentials, so any user may read another user's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    /// The user has a stored token for the music service.
    pub is_connected: bool,
    /// Something is currently playing.
    pub is_playing: bool,
    /// Capitalised context kind, e.g. `Playlist`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
    /// Public URL of the context.
    #[serde(
        default,
        rename = "contextURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub context_url: Option<String>,
    /// Human-readable name of the context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_name: Option<String>,
}

impl PlaybackStatus {
    /// The user never completed the OAuth flow.
    pub fn disconnected() -> Self {
        Self {
            is_connected: false,
            is_playing: false,
            context_type: None,
            context_url: None,
            context_name: None,
        }
    }

    /// Connected, but nothing is playing.
    pub fn idle() -> Self {
        Self {
            is_connected: true,
            ..Self::disconnected()
        }
    }

    /// Playing without a context the resolver can describe.
    pub fn playing_without_context() -> Self {
        Self {
            is_playing: true,
            ..Self::idle()
        }
    }

    /// Playing from `context`, optionally with a resolved display name.
    pub fn playing(context: &PlaybackContextReference, name: Option<String>) -> Self {
        Self {
            context_type: Some(context.kind().display_name().to_owned()),
            context_url: context.external_url().map(str::to_owned),
            context_name: name,
            ..Self::playing_without_context()
        }
    }
}
