//! Immutable configuration snapshots shared by the services.
//!
//! A reload builds a new [`ActiveConfiguration`] and swaps it in wholesale.
//! Services load one snapshot per operation and keep using it across their
//! network calls, so no lock is held while waiting on the upstream service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use super::ports::OAuthProvider;

/// Default lifetime of a resolved status.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(15 * 60);
/// Default lifetime of negative and degraded statuses.
pub const DEFAULT_NEGATIVE_STATUS_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache lifetimes applied by the status resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// TTL for fully resolved statuses (idle or playing with a name).
    pub status_ttl: Duration,
    /// TTL for "not connected" entries and statuses whose context name could
    /// not be resolved.
    pub negative_status_ttl: Duration,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            status_ttl: DEFAULT_STATUS_TTL,
            negative_status_ttl: DEFAULT_NEGATIVE_STATUS_TTL,
        }
    }
}

/// Everything a single operation needs from configuration.
#[derive(Clone, Default)]
pub struct ActiveConfiguration {
    /// Cache lifetimes.
    pub policy: ResolverPolicy,
    /// OAuth provider; `None` when client credentials are not configured.
    pub oauth: Option<Arc<dyn OAuthProvider>>,
}

impl fmt::Debug for ActiveConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveConfiguration")
            .field("policy", &self.policy)
            .field("oauth_configured", &self.oauth.is_some())
            .finish()
    }
}

/// Atomically swappable holder of the current [`ActiveConfiguration`].
pub struct ConfigurationHandle {
    current: ArcSwap<ActiveConfiguration>,
}

impl ConfigurationHandle {
    /// Start with `initial` as the active snapshot.
    pub fn new(initial: ActiveConfiguration) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// The snapshot in force right now.
    pub fn snapshot(&self) -> Arc<ActiveConfiguration> {
        self.current.load_full()
    }

    /// Replace the active snapshot. In-flight operations keep the one they
    /// loaded.
    pub fn replace(&self, next: ActiveConfiguration) {
        self.current.store(Arc::new(next));
    }
}

impl Default for ConfigurationHandle {
    fn default() -> Self {
        Self::new(ActiveConfiguration::default())
    }
}
