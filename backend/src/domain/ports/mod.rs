//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the key-value store, the OAuth provider, the music-service API, and the
//! public web). Each trait exposes strongly typed errors so adapters map their
//! failures into predictable variants instead of returning opaque errors.

mod macros;
pub(crate) use macros::define_port_error;

mod key_value_store;
mod music_service;
mod oauth_provider;
mod public_page;
mod store_key;

#[cfg(test)]
pub use key_value_store::MockKeyValueStore;
pub use key_value_store::{KeyValueStore, KeyValueStoreError};
#[cfg(test)]
pub use music_service::MockMusicServiceClient;
pub use music_service::{
    AlbumMetadata, ArtistMetadata, CurrentPlayback, ExternalAccount, MusicServiceClient,
    MusicServiceError, PlaybackContextPayload, PlaylistMetadata, ShowMetadata,
};
#[cfg(test)]
pub use oauth_provider::MockOAuthProvider;
pub use oauth_provider::{AuthorizationCallback, OAuthProvider, OAuthProviderError};
#[cfg(test)]
pub use public_page::MockPublicPageFetcher;
pub use public_page::{DisabledPublicPageFetcher, PublicPageError, PublicPageFetcher};
pub use store_key::{StoreKey, StoreKeyValidationError};
