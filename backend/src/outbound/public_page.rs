//! Reqwest-backed fetcher for public context pages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::domain::ports::{PublicPageError, PublicPageFetcher};

const DEFAULT_USER_AGENT: &str = "listening-status/0.1";

/// Largest body read from a public page; a `<title>` sits near the top.
pub const MAX_PAGE_BYTES: usize = 512 * 1024;

/// Unauthenticated HTTP GET with a request timeout.
pub struct HttpPublicPageFetcher {
    client: Client,
}

impl HttpPublicPageFetcher {
    /// Build a fetcher using a reqwest client with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PublicPageFetcher for HttpPublicPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, PublicPageError> {
        let target = parse_public_url(url)?;
        let mut response = self
            .client
            .get(target)
            .header(reqwest::header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|error| PublicPageError::transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublicPageError::transport(format!(
                "status {}",
                status.as_u16()
            )));
        }

        let mut body = CappedBody::new(MAX_PAGE_BYTES);
        body.check_declared(response.content_length())?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| PublicPageError::decode(error.to_string()))?
        {
            body.push(&chunk)?;
        }
        Ok(body.into_text())
    }
}

/// Response body accumulator that refuses to grow past `limit` bytes.
struct CappedBody {
    bytes: Vec<u8>,
    limit: usize,
}

impl CappedBody {
    const fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
        }
    }

    fn check_declared(&self, content_length: Option<u64>) -> Result<(), PublicPageError> {
        let fits = |declared: u64| usize::try_from(declared).is_ok_and(|len| len <= self.limit);
        match content_length {
            Some(declared) if !fits(declared) => Err(PublicPageError::too_large(self.limit)),
            _ => Ok(()),
        }
    }

    fn push(&mut self, chunk: &[u8]) -> Result<(), PublicPageError> {
        if self.bytes.len().saturating_add(chunk.len()) > self.limit {
            return Err(PublicPageError::too_large(self.limit));
        }
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    fn into_text(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

fn parse_public_url(raw: &str) -> Result<Url, PublicPageError> {
    let url = Url::parse(raw)
        .map_err(|error| PublicPageError::transport(format!("invalid url {raw}: {error}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PublicPageError::transport(format!(
            "unsupported scheme {other} in {raw}"
        ))),
    }
}
