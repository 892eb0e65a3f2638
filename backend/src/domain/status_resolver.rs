//! Status resolution: the only path that calls the music service.
//!
//! [`StatusResolver::resolve_own`] is the owner's path. It may refresh the
//! owner's token and call upstream. [`StatusResolver::cached_status`] serves
//! every other reader from the status cache and never resolves, so no
//! identity other than the token owner can cause the owner's credentials to
//! be presented upstream.
//!
//! A single resolution makes at most one refresh, one playback call, one
//! metadata or public-page call and one cache write. Nothing retries within
//! a resolution; the next poll does.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{debug, info, warn};

use super::configuration::{ActiveConfiguration, ConfigurationHandle};
use super::context_resolution::ContextNamer;
use super::ports::{MusicServiceClient, OAuthProvider, PublicPageFetcher};
use super::stores::{ContextNameCache, StatusCache, StatusCacheLookup, StoreSet, TokenStore};
use super::{
    DomainError, OAuthToken, PlatformUserId, PlaybackContextReference, PlaybackStatus,
    REFRESH_MARGIN,
};

/// Produces display-ready statuses, caching them per user.
#[derive(Clone)]
pub struct StatusResolver {
    configuration: Arc<ConfigurationHandle>,
    tokens: TokenStore,
    context_names: ContextNameCache,
    statuses: StatusCache,
    public_pages: Arc<dyn PublicPageFetcher>,
    clock: Arc<dyn Clock>,
}

impl StatusResolver {
    /// Build a resolver over the shared stores.
    pub fn new(
        configuration: Arc<ConfigurationHandle>,
        stores: &StoreSet,
        public_pages: Arc<dyn PublicPageFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            configuration,
            tokens: stores.tokens.clone(),
            context_names: stores.context_names.clone(),
            statuses: stores.statuses.clone(),
            public_pages,
            clock,
        }
    }

    /// Status of `user_id`, requested by that same user.
    ///
    /// Served from cache when possible; otherwise resolved upstream and
    /// cached.
    ///
    /// # Errors
    /// - [`DomainError::NotConfigured`] without OAuth credentials.
    /// - [`DomainError::TokenRefreshFailed`] when a near-expiry token cannot
    ///   be refreshed. Nothing is cached, so the next poll retries.
    /// - [`DomainError::UpstreamUnavailable`] when the playback call fails.
    /// - [`DomainError::Storage`] when the token cannot be read or the
    ///   refreshed token cannot be saved.
    pub async fn resolve_own(&self, user_id: &PlatformUserId) -> Result<PlaybackStatus, DomainError> {
        let config = self.configuration.snapshot();
        let oauth = require_oauth(&config)?;

        match self.statuses.get(user_id).await {
            Ok(StatusCacheLookup::Status(status)) => {
                debug!(user_id = %user_id, "status cache hit");
                return Ok(status);
            }
            Ok(StatusCacheLookup::Unavailable) => {
                debug!(user_id = %user_id, "negative status cache hit");
                return Ok(PlaybackStatus::disconnected());
            }
            Ok(StatusCacheLookup::Miss) => {}
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "status cache read failed; resolving fresh");
            }
        }

        self.resolve_fresh(&config, oauth, user_id).await
    }

    /// Drop the cached status of `user_id` and resolve it again.
    ///
    /// # Errors
    /// As for [`Self::resolve_own`].
    pub async fn refresh_own(&self, user_id: &PlatformUserId) -> Result<PlaybackStatus, DomainError> {
        let config = self.configuration.snapshot();
        let oauth = require_oauth(&config)?;
        if let Err(err) = self.statuses.invalidate(user_id).await {
            warn!(user_id = %user_id, error = %err, "failed to invalidate cached status");
        }
        self.resolve_fresh(&config, oauth, user_id).await
    }

    /// Cached status of `user_id` for any reader. Never resolves.
    ///
    /// `None` means nothing is cached; store failures are logged and reported
    /// the same way.
    pub async fn cached_status(&self, user_id: &PlatformUserId) -> Option<PlaybackStatus> {
        match self.statuses.get(user_id).await {
            Ok(StatusCacheLookup::Status(status)) => Some(status),
            Ok(StatusCacheLookup::Unavailable) => Some(PlaybackStatus::disconnected()),
            Ok(StatusCacheLookup::Miss) => None,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "status cache read failed");
                None
            }
        }
    }

    async fn resolve_fresh(
        &self,
        config: &ActiveConfiguration,
        oauth: &dyn OAuthProvider,
        user_id: &PlatformUserId,
    ) -> Result<PlaybackStatus, DomainError> {
        let policy = config.policy;
        let Some(stored) = self.tokens.get(user_id).await? else {
            debug!(user_id = %user_id, "no token stored; user is not connected");
            self.cache_best_effort(user_id, None, policy.negative_status_ttl)
                .await;
            return Ok(PlaybackStatus::disconnected());
        };

        let token = self.ensure_fresh(oauth, user_id, stored).await?;
        let client = oauth.authorized_client(&token);
        let playback = client.current_playback().await.map_err(|err| {
            warn!(user_id = %user_id, error = %err, kind = err.kind(), "current playback call failed");
            DomainError::upstream_unavailable(err.to_string())
        })?;

        let (status, ttl) = match playback {
            Some(playback) if playback.is_playing => match playback.context {
                Some(payload) => match PlaybackContextReference::parse(
                    &payload.kind,
                    &payload.uri,
                    payload.external_url,
                ) {
                    Ok(context) => self.describe(client.as_ref(), &context, config).await,
                    Err(err) => {
                        debug!(user_id = %user_id, error = %err, "context not describable");
                        (PlaybackStatus::playing_without_context(), policy.status_ttl)
                    }
                },
                None => (PlaybackStatus::playing_without_context(), policy.status_ttl),
            },
            _ => (PlaybackStatus::idle(), policy.status_ttl),
        };

        self.cache_best_effort(user_id, Some(&status), ttl).await;
        info!(
            user_id = %user_id,
            is_playing = status.is_playing,
            context_type = status.context_type.as_deref(),
            "resolved listening status"
        );
        Ok(status)
    }

    /// Refresh `token` when it expires within [`REFRESH_MARGIN`] and persist
    /// the replacement before it is used.
    async fn ensure_fresh(
        &self,
        oauth: &dyn OAuthProvider,
        user_id: &PlatformUserId,
        token: OAuthToken,
    ) -> Result<OAuthToken, DomainError> {
        if !token.expires_within(self.clock.utc(), REFRESH_MARGIN) {
            return Ok(token);
        }

        debug!(user_id = %user_id, expiry = %token.expiry(), "refreshing access token");
        let refreshed = oauth.refresh_token(&token).await.map_err(|err| {
            warn!(user_id = %user_id, error = %err, kind = err.kind(), "token refresh failed");
            DomainError::TokenRefreshFailed {
                message: err.to_string(),
            }
        })?;
        refreshed
            .validate()
            .map_err(|err| DomainError::TokenRefreshFailed {
                message: err.to_string(),
            })?;
        self.tokens.put(user_id, &refreshed).await?;
        info!(user_id = %user_id, expiry = %refreshed.expiry(), "access token refreshed");
        Ok(refreshed)
    }

    /// Status for a playing context. Naming failures degrade to a nameless
    /// status cached for the negative TTL so the name is retried sooner.
    async fn describe(
        &self,
        client: &dyn MusicServiceClient,
        context: &PlaybackContextReference,
        config: &ActiveConfiguration,
    ) -> (PlaybackStatus, Duration) {
        let policy = config.policy;
        match self.context_name(client, context).await {
            Some(name) => (PlaybackStatus::playing(context, Some(name)), policy.status_ttl),
            None => (
                PlaybackStatus::playing(context, None),
                policy.negative_status_ttl,
            ),
        }
    }

    async fn context_name(
        &self,
        client: &dyn MusicServiceClient,
        context: &PlaybackContextReference,
    ) -> Option<String> {
        match self.context_names.get(context.kind(), context.id()).await {
            Ok(Some(name)) => return Some(name),
            Ok(None) => {}
            Err(err) => {
                warn!(
                    context_type = %context.kind(),
                    context_id = context.id(),
                    error = %err,
                    "context name cache read failed"
                );
            }
        }

        let namer = ContextNamer::new(client, self.public_pages.as_ref());
        match namer.name(context).await {
            Ok(name) => {
                if let Err(err) = self
                    .context_names
                    .put(context.kind(), context.id(), &name)
                    .await
                {
                    warn!(
                        context_type = %context.kind(),
                        context_id = context.id(),
                        error = %err,
                        "failed to cache context name"
                    );
                }
                Some(name)
            }
            Err(err) => {
                warn!(
                    context_type = %context.kind(),
                    context_id = context.id(),
                    error = %err,
                    "context name resolution failed; returning status without a name"
                );
                None
            }
        }
    }

    async fn cache_best_effort(
        &self,
        user_id: &PlatformUserId,
        status: Option<&PlaybackStatus>,
        ttl: Duration,
    ) {
        if let Err(err) = self.statuses.put(user_id, status, ttl).await {
            warn!(user_id = %user_id, error = %err, "failed to cache status");
        }
    }
}

fn require_oauth(config: &ActiveConfiguration) -> Result<&dyn OAuthProvider, DomainError> {
    config.oauth.as_deref().ok_or(DomainError::NotConfigured)
}

#[cfg(test)]
#[path = "status_resolver_tests.rs"]
mod tests;
