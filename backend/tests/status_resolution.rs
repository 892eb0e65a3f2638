//! End-to-end status resolution over the in-memory store.
//!
//! Upstream collaborators are scripted stubs that count their calls, and
//! time is driven by a `MutableClock` shared with the store so TTL expiry is
//! observable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use listening_status::domain::ports::{
    AlbumMetadata, ArtistMetadata, AuthorizationCallback, CurrentPlayback, ExternalAccount,
    MusicServiceClient, MusicServiceError, OAuthProvider, OAuthProviderError,
    PlaybackContextPayload, PlaylistMetadata, PublicPageError, PublicPageFetcher, ShowMetadata,
};
use listening_status::domain::{
    ActiveConfiguration, ConfigurationHandle, OAuthToken, PlatformUserId, PlaybackStatus,
    ResolverPolicy, StatusResolver, StoreSet,
};
use listening_status::outbound::kv::InMemoryKeyValueStore;
use listening_status::test_support::MutableClock;
use mockable::Clock;
use rstest::{fixture, rstest};
use url::Url;

const PLAYLIST_URL: &str = "https://open.spotify.com/playlist/p1";

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0)
        .single()
        .expect("valid time")
}

/// Web API stub: replays one playback snapshot; playlists are never
/// visible so naming must go through the public page.
struct ScriptedClient {
    access_token: String,
    playback: Option<CurrentPlayback>,
    playback_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl MusicServiceClient for ScriptedClient {
    async fn current_playback(&self) -> Result<Option<CurrentPlayback>, MusicServiceError> {
        self.playback_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.playback.clone())
    }

    async fn artist(&self, id: &str) -> Result<ArtistMetadata, MusicServiceError> {
        Err(MusicServiceError::not_found(format!("artist {id}")))
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistMetadata, MusicServiceError> {
        Err(MusicServiceError::not_found(format!(
            "playlist {id} for {}",
            self.access_token
        )))
    }

    async fn album(&self, id: &str) -> Result<AlbumMetadata, MusicServiceError> {
        Err(MusicServiceError::not_found(format!("album {id}")))
    }

    async fn show(&self, id: &str) -> Result<ShowMetadata, MusicServiceError> {
        Err(MusicServiceError::not_found(format!("show {id}")))
    }

    async fn current_user(&self) -> Result<ExternalAccount, MusicServiceError> {
        Ok(ExternalAccount {
            email: "owner@example.com".to_owned(),
        })
    }
}

/// OAuth stub that refreshes into a one-hour token and records which
/// access tokens were used to build clients.
struct ScriptedProvider {
    clock: Arc<MutableClock>,
    playback: Option<CurrentPlayback>,
    playback_calls: Arc<AtomicUsize>,
    refresh_calls: AtomicUsize,
    presented_tokens: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn presented_tokens(&self) -> Vec<String> {
        self.presented_tokens
            .lock()
            .expect("tokens mutex")
            .clone()
    }
}

#[async_trait]
impl OAuthProvider for ScriptedProvider {
    fn authorization_url(&self, state: &str) -> Url {
        let mut url = Url::parse("https://accounts.example.com/authorize").expect("valid url");
        url.query_pairs_mut().append_pair("state", state);
        url
    }

    async fn exchange_code(
        &self,
        _callback: &AuthorizationCallback,
    ) -> Result<OAuthToken, OAuthProviderError> {
        Err(OAuthProviderError::rejected("not scripted"))
    }

    async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken, OAuthProviderError> {
        let attempt = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        OAuthToken::new(
            format!("refreshed-access-{attempt}"),
            token.refresh_token(),
            self.clock.utc() + TimeDelta::hours(1),
        )
        .map_err(|err| OAuthProviderError::decode(err.to_string()))
    }

    fn authorized_client(&self, token: &OAuthToken) -> Arc<dyn MusicServiceClient> {
        self.presented_tokens
            .lock()
            .expect("tokens mutex")
            .push(token.access_token().to_owned());
        Arc::new(ScriptedClient {
            access_token: token.access_token().to_owned(),
            playback: self.playback.clone(),
            playback_calls: self.playback_calls.clone(),
        })
    }
}

struct StaticPages {
    html: String,
    calls: AtomicUsize,
}

#[async_trait]
impl PublicPageFetcher for StaticPages {
    async fn fetch_html(&self, url: &str) -> Result<String, PublicPageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url == PLAYLIST_URL {
            Ok(self.html.clone())
        } else {
            Err(PublicPageError::transport(format!("no page at {url}")))
        }
    }
}

struct World {
    clock: Arc<MutableClock>,
    stores: StoreSet,
    provider: Arc<ScriptedProvider>,
    pages: Arc<StaticPages>,
    playback_calls: Arc<AtomicUsize>,
    resolver: StatusResolver,
}

impl World {
    fn new(playback: Option<CurrentPlayback>) -> Self {
        let clock = Arc::new(MutableClock::new(start()));
        let kv = Arc::new(InMemoryKeyValueStore::new(clock.clone()));
        let stores = StoreSet::new(kv);
        let playback_calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(ScriptedProvider {
            clock: clock.clone(),
            playback,
            playback_calls: playback_calls.clone(),
            refresh_calls: AtomicUsize::new(0),
            presented_tokens: Mutex::new(Vec::new()),
        });
        let pages = Arc::new(StaticPages {
            html: "<html><head><title>Focus Mix | Spotify Playlist</title></head></html>"
                .to_owned(),
            calls: AtomicUsize::new(0),
        });
        let configuration = Arc::new(ConfigurationHandle::new(ActiveConfiguration {
            policy: ResolverPolicy::default(),
            oauth: Some(provider.clone()),
        }));
        let resolver = StatusResolver::new(configuration, &stores, pages.clone(), clock.clone());
        Self {
            clock,
            stores,
            provider,
            pages,
            playback_calls,
            resolver,
        }
    }

    async fn connect(&self, user: &PlatformUserId, expires_in: TimeDelta) {
        let token = OAuthToken::new("stored-access", "stored-refresh", start() + expires_in)
            .expect("valid token");
        self.stores
            .tokens
            .put(user, &token)
            .await
            .expect("token stored");
    }

    fn playback_calls(&self) -> usize {
        self.playback_calls.load(Ordering::SeqCst)
    }
}

fn playing_playlist() -> Option<CurrentPlayback> {
    Some(CurrentPlayback {
        is_playing: true,
        context: Some(PlaybackContextPayload {
            kind: "playlist".to_owned(),
            uri: "spotify:playlist:p1".to_owned(),
            external_url: Some(PLAYLIST_URL.to_owned()),
        }),
    })
}

fn focus_mix() -> PlaybackStatus {
    PlaybackStatus {
        is_connected: true,
        is_playing: true,
        context_type: Some("Playlist".to_owned()),
        context_url: Some(PLAYLIST_URL.to_owned()),
        context_name: Some("Focus Mix".to_owned()),
    }
}

#[fixture]
fn owner() -> PlatformUserId {
    PlatformUserId::new("owner").expect("valid id")
}

#[rstest]
#[tokio::test]
async fn owner_resolution_is_shared_with_readers_until_it_expires(owner: PlatformUserId) {
    let world = World::new(playing_playlist());
    world.connect(&owner, TimeDelta::hours(1)).await;

    assert_eq!(world.resolver.cached_status(&owner).await, None);
    assert_eq!(
        world.resolver.resolve_own(&owner).await.expect("resolved"),
        focus_mix()
    );
    assert_eq!(world.resolver.cached_status(&owner).await, Some(focus_mix()));
    assert_eq!(
        world.resolver.resolve_own(&owner).await.expect("cached"),
        focus_mix()
    );
    assert_eq!(world.playback_calls(), 1);

    world.clock.advance(Duration::from_secs(15 * 60 + 1));
    assert_eq!(world.resolver.cached_status(&owner).await, None);
    assert_eq!(world.playback_calls(), 1);
}

#[rstest]
#[tokio::test]
async fn context_names_outlive_status_entries(owner: PlatformUserId) {
    let world = World::new(playing_playlist());
    world.connect(&owner, TimeDelta::days(1)).await;

    world.resolver.resolve_own(&owner).await.expect("first");
    world.clock.advance(Duration::from_secs(15 * 60 + 1));
    let second = world.resolver.resolve_own(&owner).await.expect("second");

    assert_eq!(second, focus_mix());
    assert_eq!(world.playback_calls(), 2);
    assert_eq!(world.pages.calls.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn near_expiry_token_is_refreshed_persisted_and_used(owner: PlatformUserId) {
    let world = World::new(None);
    world.connect(&owner, TimeDelta::minutes(2)).await;

    let status = world.resolver.resolve_own(&owner).await.expect("resolved");

    assert_eq!(status, PlaybackStatus::idle());
    assert_eq!(world.provider.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(world.provider.presented_tokens(), vec!["refreshed-access-1"]);
    let stored = world
        .stores
        .tokens
        .get(&owner)
        .await
        .expect("token readable")
        .expect("token present");
    assert_eq!(stored.access_token(), "refreshed-access-1");
    assert_eq!(stored.refresh_token(), "stored-refresh");
    assert_eq!(stored.expiry(), start() + TimeDelta::hours(1));
}

#[rstest]
#[tokio::test]
async fn unconnected_users_are_cached_briefly(owner: PlatformUserId) {
    let world = World::new(playing_playlist());

    assert_eq!(
        world.resolver.resolve_own(&owner).await.expect("resolved"),
        PlaybackStatus::disconnected()
    );
    assert_eq!(
        world.resolver.cached_status(&owner).await,
        Some(PlaybackStatus::disconnected())
    );
    assert_eq!(world.playback_calls(), 0);

    world.clock.advance(Duration::from_secs(5 * 60 + 1));
    assert_eq!(world.resolver.cached_status(&owner).await, None);
}

#[rstest]
#[tokio::test]
async fn readers_never_reach_upstream(owner: PlatformUserId) {
    let world = World::new(playing_playlist());
    world.connect(&owner, TimeDelta::minutes(1)).await;

    for _ in 0..3 {
        assert_eq!(world.resolver.cached_status(&owner).await, None);
    }

    assert_eq!(world.playback_calls(), 0);
    assert_eq!(world.provider.refresh_calls.load(Ordering::SeqCst), 0);
    assert!(world.provider.presented_tokens().is_empty());
}
