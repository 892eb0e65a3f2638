//! DTOs for decoding Spotify accounts and Web API responses.
//!
//! The adapters decode into these transport DTOs first, then map into the
//! port's records in one pass. Only the fields the domain reads are modelled.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::ports::{
    AlbumMetadata, ArtistMetadata, CurrentPlayback, ExternalAccount, PlaybackContextPayload,
    PlaylistMetadata, ShowMetadata,
};

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) access_token: String,
    #[serde(default)]
    pub(super) token_type: String,
    pub(super) expires_in: i64,
    #[serde(default)]
    pub(super) refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenErrorDto {
    pub(super) error: String,
    #[serde(default)]
    pub(super) error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CurrentPlaybackDto {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    context: Option<PlaybackContextDto>,
}

#[derive(Debug, Deserialize)]
struct PlaybackContextDto {
    #[serde(rename = "type")]
    kind: String,
    uri: String,
    #[serde(default)]
    external_urls: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NamedDto {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct AlbumDto {
    name: String,
    #[serde(default)]
    artists: Vec<NamedDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserDto {
    #[serde(default)]
    email: Option<String>,
}

impl From<CurrentPlaybackDto> for CurrentPlayback {
    fn from(dto: CurrentPlaybackDto) -> Self {
        Self {
            is_playing: dto.is_playing,
            context: dto.context.map(|mut context| PlaybackContextPayload {
                external_url: context.external_urls.remove("spotify"),
                kind: context.kind,
                uri: context.uri,
            }),
        }
    }
}

impl From<NamedDto> for ArtistMetadata {
    fn from(dto: NamedDto) -> Self {
        Self { name: dto.name }
    }
}

impl From<NamedDto> for PlaylistMetadata {
    fn from(dto: NamedDto) -> Self {
        Self { name: dto.name }
    }
}

impl From<NamedDto> for ShowMetadata {
    fn from(dto: NamedDto) -> Self {
        Self { name: dto.name }
    }
}

impl From<AlbumDto> for AlbumMetadata {
    fn from(dto: AlbumDto) -> Self {
        Self {
            name: dto.name,
            artists: dto.artists.into_iter().map(|artist| artist.name).collect(),
        }
    }
}

impl UserDto {
    pub(super) fn into_account(self) -> Result<ExternalAccount, String> {
        self.email
            .filter(|email| !email.trim().is_empty())
            .map(|email| ExternalAccount { email })
            .ok_or_else(|| "profile has no email; is the user-read-email scope granted?".to_owned())
    }
}
