//! Naming strategies for playback contexts.
//!
//! Each [`ContextKind`] has its own upstream endpoint and naming rule. Only
//! playlists fall back to scraping the public page, and only when the
//! metadata endpoint reports the playlist as not found.

use thiserror::Error;
use tracing::debug;

use super::ports::{
    AlbumMetadata, MusicServiceClient, MusicServiceError, PublicPageError, PublicPageFetcher,
};
use super::{ContextKind, PlaybackContextReference};

/// Suffix the service appends to public playlist page titles.
pub const PLAYLIST_TITLE_SUFFIX: &str = " | Spotify Playlist";

/// Why a context could not be named.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextResolutionError {
    /// The metadata endpoint failed.
    #[error(transparent)]
    Upstream(#[from] MusicServiceError),
    /// The public-page fallback could not be fetched.
    #[error(transparent)]
    PublicPage(#[from] PublicPageError),
    /// The public page was fetched but carried no usable `<title>`.
    #[error("public page {url} has no usable title")]
    UntitledPage { url: String },
    /// The service returned a blank name.
    #[error("{kind} {id} has an empty name")]
    EmptyName { kind: ContextKind, id: String },
}

/// Resolves display names through one authorised client.
pub(crate) struct ContextNamer<'a> {
    client: &'a dyn MusicServiceClient,
    public_pages: &'a dyn PublicPageFetcher,
}

impl<'a> ContextNamer<'a> {
    pub(crate) fn new(
        client: &'a dyn MusicServiceClient,
        public_pages: &'a dyn PublicPageFetcher,
    ) -> Self {
        Self {
            client,
            public_pages,
        }
    }

    /// Look up the live display name of `context`.
    pub(crate) async fn name(
        &self,
        context: &PlaybackContextReference,
    ) -> Result<String, ContextResolutionError> {
        let id = context.id();
        let raw = match context.kind() {
            ContextKind::Artist => self.client.artist(id).await?.name,
            ContextKind::Playlist => self.playlist_name(context).await?,
            ContextKind::Album => album_display_name(self.client.album(id).await?),
            ContextKind::Show => self.client.show(id).await?.name,
        };
        let name = raw.trim();
        if name.is_empty() {
            return Err(ContextResolutionError::EmptyName {
                kind: context.kind(),
                id: id.to_owned(),
            });
        }
        Ok(name.to_owned())
    }

    async fn playlist_name(
        &self,
        context: &PlaybackContextReference,
    ) -> Result<String, ContextResolutionError> {
        match self.client.playlist(context.id()).await {
            Ok(playlist) => Ok(playlist.name),
            Err(MusicServiceError::NotFound { message }) => match context.external_url() {
                Some(url) => {
                    debug!(playlist_id = context.id(), %url, "playlist metadata hidden; reading public page");
                    let html = self.public_pages.fetch_html(url).await?;
                    extract_page_title(&html).ok_or_else(|| ContextResolutionError::UntitledPage {
                        url: url.to_owned(),
                    })
                }
                None => Err(MusicServiceError::not_found(message).into()),
            },
            Err(err) => Err(err.into()),
        }
    }
}

/// `"<album> - <primary artist>"`, or the bare album name when no artist is
/// credited.
fn album_display_name(album: AlbumMetadata) -> String {
    match album.artists.first() {
        Some(artist) => format!("{} - {}", album.name, artist),
        None => album.name,
    }
}

/// Text of the first `<title>` element with the playlist suffix removed.
///
/// # Examples
/// ```
/// use listening_status::domain::extract_page_title;
///
/// let html = "<html><head><title>Chill Vibes | Spotify Playlist</title></head></html>";
/// assert_eq!(extract_page_title(html).as_deref(), Some("Chill Vibes"));
/// ```
pub fn extract_page_title(html: &str) -> Option<String> {
    const OPEN: &str = "<title>";
    const CLOSE: &str = "</title>";

    let (_, after_open) = html.split_once(OPEN)?;
    let (raw_title, _) = after_open.split_once(CLOSE)?;
    // A title holding only the suffix trims to `| Spotify Playlist`.
    let trimmed = raw_title.trim();
    let without_suffix = trimmed
        .strip_suffix(PLAYLIST_TITLE_SUFFIX.trim_start())
        .unwrap_or(trimmed);
    let decoded = decode_entities(without_suffix.trim_end());
    (!decoded.is_empty()).then_some(decoded)
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{
        ArtistMetadata, MockMusicServiceClient, MockPublicPageFetcher, PlaylistMetadata,
        ShowMetadata,
    };

    const PLAYLIST_URL: &str = "https://open.spotify.com/playlist/abc123";

    fn reference(kind: &str, url: Option<&str>) -> PlaybackContextReference {
        PlaybackContextReference::parse(kind, &format!("spotify:{kind}:abc123"), url.map(str::to_owned))
            .expect("valid context")
    }

    #[rstest]
    #[case("<title>Chill Vibes | Spotify Playlist</title>", Some("Chill Vibes"))]
    #[case("<head><title>  Road Trip  </title></head>", Some("Road Trip"))]
    #[case("<title>Tom &amp; Jerry&#39;s Mix | Spotify Playlist</title>", Some("Tom & Jerry's Mix"))]
    #[case("<title> | Spotify Playlist</title>", None)]
    #[case("<title>| Spotify Playlist</title>", None)]
    #[case("<title>\n  Focus Mix | Spotify Playlist \n</title>", Some("Focus Mix"))]
    #[case("<title>Unclosed", None)]
    #[case("</title>reversed<title>", None)]
    #[case("no title here", None)]
    fn extracts_titles(#[case] html: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_page_title(html).as_deref(), expected);
    }

    #[rstest]
    #[case(vec!["Radiohead".to_owned(), "Guest".to_owned()], "OK Computer - Radiohead")]
    #[case(Vec::new(), "OK Computer")]
    fn album_names_credit_the_primary_artist(#[case] artists: Vec<String>, #[case] expected: &str) {
        let album = AlbumMetadata {
            name: "OK Computer".to_owned(),
            artists,
        };
        assert_eq!(album_display_name(album), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn each_kind_uses_its_own_endpoint() {
        let mut client = MockMusicServiceClient::new();
        client.expect_artist().times(1).returning(|_| {
            Ok(ArtistMetadata {
                name: "Nina Simone".to_owned(),
            })
        });
        client.expect_show().times(1).returning(|_| {
            Ok(ShowMetadata {
                name: "Daily Briefing".to_owned(),
            })
        });
        let pages = MockPublicPageFetcher::new();
        let namer = ContextNamer::new(&client, &pages);

        assert_eq!(
            namer.name(&reference("artist", None)).await.expect("artist"),
            "Nina Simone"
        );
        assert_eq!(
            namer.name(&reference("show", None)).await.expect("show"),
            "Daily Briefing"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn hidden_playlist_falls_back_to_public_page() {
        let mut client = MockMusicServiceClient::new();
        client
            .expect_playlist()
            .returning(|_| Err(MusicServiceError::not_found("Resource not found")));
        let mut pages = MockPublicPageFetcher::new();
        pages
            .expect_fetch_html()
            .withf(|url| url == PLAYLIST_URL)
            .times(1)
            .returning(|_| Ok("<title>Chill Vibes | Spotify Playlist</title>".to_owned()));
        let namer = ContextNamer::new(&client, &pages);

        let name = namer
            .name(&reference("playlist", Some(PLAYLIST_URL)))
            .await
            .expect("fallback name");
        assert_eq!(name, "Chill Vibes");
    }

    #[rstest]
    #[tokio::test]
    async fn hidden_playlist_without_url_reports_not_found() {
        let mut client = MockMusicServiceClient::new();
        client
            .expect_playlist()
            .returning(|_| Err(MusicServiceError::not_found("Resource not found")));
        let pages = MockPublicPageFetcher::new();
        let namer = ContextNamer::new(&client, &pages);

        let err = namer
            .name(&reference("playlist", None))
            .await
            .expect_err("no fallback possible");
        assert!(matches!(
            err,
            ContextResolutionError::Upstream(MusicServiceError::NotFound { .. })
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn other_playlist_failures_skip_the_fallback() {
        let mut client = MockMusicServiceClient::new();
        client
            .expect_playlist()
            .returning(|_| Err(MusicServiceError::rate_limited("slow down")));
        let mut pages = MockPublicPageFetcher::new();
        pages.expect_fetch_html().never();
        let namer = ContextNamer::new(&client, &pages);

        let err = namer
            .name(&reference("playlist", Some(PLAYLIST_URL)))
            .await
            .expect_err("rate limited");
        assert!(matches!(
            err,
            ContextResolutionError::Upstream(MusicServiceError::RateLimited { .. })
        ));
    }

    #[rstest]
    #[case::no_title("<html></html>")]
    #[case::suffix_only("<title> | Spotify Playlist</title>")]
    #[case::blank_title("<title>   </title>")]
    #[tokio::test]
    async fn untitled_public_page_is_an_error(#[case] html: &'static str) {
        let mut client = MockMusicServiceClient::new();
        client
            .expect_playlist()
            .returning(|_| Err(MusicServiceError::not_found("Resource not found")));
        let mut pages = MockPublicPageFetcher::new();
        pages
            .expect_fetch_html()
            .returning(move |_| Ok(html.to_owned()));
        let namer = ContextNamer::new(&client, &pages);

        let err = namer
            .name(&reference("playlist", Some(PLAYLIST_URL)))
            .await
            .expect_err("untitled page");
        assert!(matches!(err, ContextResolutionError::UntitledPage { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn blank_upstream_names_are_rejected() {
        let mut client = MockMusicServiceClient::new();
        client.expect_playlist().returning(|_| {
            Ok(PlaylistMetadata {
                name: "   ".to_owned(),
            })
        });
        let pages = Arc::new(MockPublicPageFetcher::new());
        let namer = ContextNamer::new(&client, pages.as_ref());

        let err = namer
            .name(&reference("playlist", None))
            .await
            .expect_err("blank name");
        assert!(matches!(err, ContextResolutionError::EmptyName { .. }));
    }
}
