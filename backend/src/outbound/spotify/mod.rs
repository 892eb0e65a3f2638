//! Spotify outbound adapters.
//!
//! This module provides reqwest implementations of the `OAuthProvider` and
//! `MusicServiceClient` ports. The OAuth provider hands out one
//! `SpotifyHttpClient` per token.

mod dto;
mod http_client;
mod oauth;

pub use http_client::SpotifyHttpClient;
pub use oauth::{SpotifyCredentials, SpotifyEndpoints, SpotifyOAuthProvider};

/// Default Web API base.
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1/";
/// Default accounts service base.
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com/";

/// Whitespace-compacted, length-capped rendering of an error body.
fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

fn endpoint(base: &url::Url, segments: &[&str]) -> Result<url::Url, String> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| format!("base url {base} cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
