//! Reqwest-backed Spotify Web API client for one access token.
//!
//! This adapter owns transport details only: bearer authentication, HTTP
//! status mapping, and JSON decoding into port records.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;
use zeroize::Zeroizing;

use super::dto::{AlbumDto, CurrentPlaybackDto, NamedDto, UserDto};
use super::{body_preview, endpoint};
use crate::domain::ports::{
    AlbumMetadata, ArtistMetadata, CurrentPlayback, ExternalAccount, MusicServiceClient,
    MusicServiceError, PlaylistMetadata, ShowMetadata,
};

/// Web API client acting as the owner of one access token.
pub struct SpotifyHttpClient {
    client: Client,
    api_base: Url,
    access_token: Zeroizing<String>,
}

impl SpotifyHttpClient {
    /// Wrap a shared reqwest client; `api_base` is e.g.
    /// `https://api.spotify.com/v1/`.
    pub fn new(client: Client, api_base: Url, access_token: &str) -> Self {
        Self {
            client,
            api_base,
            access_token: Zeroizing::new(access_token.to_owned()),
        }
    }

    /// GET `segments` below the API base. `None` for 204 No Content.
    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Option<T>, MusicServiceError> {
        let url = endpoint(&self.api_base, segments).map_err(MusicServiceError::transport)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        decode(body.as_ref()).map(Some)
    }

    async fn get_required<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, MusicServiceError> {
        self.get_json(segments, query).await?.ok_or_else(|| {
            MusicServiceError::decode(format!("empty response from /{}", segments.join("/")))
        })
    }
}

#[async_trait]
impl MusicServiceClient for SpotifyHttpClient {
    async fn current_playback(&self) -> Result<Option<CurrentPlayback>, MusicServiceError> {
        let playback: Option<CurrentPlaybackDto> = self.get_json(&["me", "player"], &[]).await?;
        Ok(playback.map(CurrentPlayback::from))
    }

    async fn artist(&self, id: &str) -> Result<ArtistMetadata, MusicServiceError> {
        let artist: NamedDto = self.get_required(&["artists", id], &[]).await?;
        Ok(artist.into())
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistMetadata, MusicServiceError> {
        let playlist: NamedDto = self
            .get_required(&["playlists", id], &[("fields", "name")])
            .await?;
        Ok(playlist.into())
    }

    async fn album(&self, id: &str) -> Result<AlbumMetadata, MusicServiceError> {
        let album: AlbumDto = self.get_required(&["albums", id], &[]).await?;
        Ok(album.into())
    }

    async fn show(&self, id: &str) -> Result<ShowMetadata, MusicServiceError> {
        let show: NamedDto = self
            .get_required(&["shows", id], &[("market", "from_token")])
            .await?;
        Ok(show.into())
    }

    async fn current_user(&self) -> Result<ExternalAccount, MusicServiceError> {
        let user: UserDto = self.get_required(&["me"], &[]).await?;
        user.into_account().map_err(MusicServiceError::decode)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, MusicServiceError> {
    serde_json::from_slice(body)
        .map_err(|error| MusicServiceError::decode(format!("invalid Spotify JSON payload: {error}")))
}

fn map_transport_error(error: reqwest::Error) -> MusicServiceError {
    MusicServiceError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MusicServiceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::NOT_FOUND => MusicServiceError::not_found(message),
        StatusCode::UNAUTHORIZED => MusicServiceError::unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => MusicServiceError::rate_limited(message),
        _ => MusicServiceError::transport(message),
    }
}
