//! Assemble services from settings.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use thiserror::Error;
use tracing::info;

use crate::domain::ports::{KeyValueStore, KeyValueStoreError};
use crate::domain::{
    ActiveConfiguration, ConfigurationHandle, ConnectionService, StatusResolver, StoreSet,
};
use crate::outbound::kv::{InMemoryKeyValueStore, RedisKeyValueStore};
use crate::outbound::public_page::HttpPublicPageFetcher;
use crate::outbound::spotify::{SpotifyCredentials, SpotifyEndpoints, SpotifyOAuthProvider};
use crate::settings::{SettingsError, StatusSettings};

/// Failures while building services.
#[derive(Debug, Error)]
pub enum WiringError {
    /// Settings were inconsistent or malformed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// An HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The key-value backend could not be reached.
    #[error(transparent)]
    Store(#[from] KeyValueStoreError),
}

/// Services sharing one store and one configuration handle.
#[derive(Clone)]
pub struct Services {
    /// Current configuration; replaced by [`Services::reload`].
    pub configuration: Arc<ConfigurationHandle>,
    /// Status resolution.
    pub resolver: StatusResolver,
    /// Registration and the OAuth flow.
    pub connections: ConnectionService,
    clock: Arc<dyn Clock>,
}

impl Services {
    /// Swap in a configuration built from `settings`.
    ///
    /// The key-value backend is not rebuilt; a changed `redis_url` needs a
    /// restart.
    pub fn reload(&self, settings: &StatusSettings) -> Result<(), WiringError> {
        let next = active_configuration(settings, self.clock.clone())?;
        self.configuration.replace(next);
        info!("configuration reloaded");
        Ok(())
    }
}

/// Build every service from `settings`.
///
/// Redis backs the stores when `redis_url` is set; otherwise state lives in
/// process memory and is lost on exit.
pub async fn build(settings: &StatusSettings) -> Result<Services, WiringError> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let kv = key_value_store(settings, clock.clone()).await?;
    build_with(settings, kv, clock)
}

/// Build every service over an existing store and clock.
pub fn build_with(
    settings: &StatusSettings,
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
) -> Result<Services, WiringError> {
    let configuration = Arc::new(ConfigurationHandle::new(active_configuration(
        settings,
        clock.clone(),
    )?));
    let stores = StoreSet::new(kv);
    let public_pages = Arc::new(HttpPublicPageFetcher::new(settings.http_timeout()?)?);
    Ok(Services {
        resolver: StatusResolver::new(
            configuration.clone(),
            &stores,
            public_pages,
            clock.clone(),
        ),
        connections: ConnectionService::new(configuration.clone(), &stores),
        configuration,
        clock,
    })
}

/// Resolver policy plus the OAuth provider when credentials are set.
pub fn active_configuration(
    settings: &StatusSettings,
    clock: Arc<dyn Clock>,
) -> Result<ActiveConfiguration, WiringError> {
    let policy = settings.policy()?;
    let Some(oauth) = settings.oauth()? else {
        return Ok(ActiveConfiguration {
            policy,
            oauth: None,
        });
    };
    let provider = SpotifyOAuthProvider::new(
        SpotifyCredentials {
            client_id: oauth.client_id,
            client_secret: oauth.client_secret,
            redirect_url: oauth.redirect_url,
        },
        SpotifyEndpoints {
            accounts_base: oauth.accounts_base,
            api_base: oauth.api_base,
        },
        settings.http_timeout()?,
        clock,
    )?;
    Ok(ActiveConfiguration {
        policy,
        oauth: Some(Arc::new(provider)),
    })
}

async fn key_value_store(
    settings: &StatusSettings,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn KeyValueStore>, WiringError> {
    match settings
        .redis_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    {
        Some(url) => {
            let store = RedisKeyValueStore::connect(url).await?;
            info!("using redis key-value store");
            Ok(Arc::new(store))
        }
        None => {
            info!("using in-memory key-value store");
            Ok(Arc::new(InMemoryKeyValueStore::new(clock)))
        }
    }
}
