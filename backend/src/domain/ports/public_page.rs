//! Driven port for unauthenticated fetches of public context pages.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced while fetching a public page.
    pub enum PublicPageError {
        /// The URL could not be requested or returned a non-success status.
        Transport { message: String } => "public page fetch failed: {message}",
        /// The body was not readable text.
        Decode { message: String } => "public page body unreadable: {message}",
        /// The body was larger than the fetcher accepts.
        TooLarge { limit: usize } => "public page body exceeds {limit} bytes",
    }
}

/// Plain GET of a public web page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublicPageFetcher: Send + Sync {
    /// Fetch the raw HTML body served at `url`.
    async fn fetch_html(&self, url: &str) -> Result<String, PublicPageError>;
}

/// Fetcher that never reaches the network; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPublicPageFetcher;

#[async_trait]
impl PublicPageFetcher for DisabledPublicPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, PublicPageError> {
        Err(PublicPageError::transport(format!(
            "public page fetching is disabled ({url})"
        )))
    }
}
