//! Feed fetching.
//!
//! [`FeedSource`] is the seam between the ticker and the network; the
//! production implementation is [`HttpFeedSource`], which downloads an RSS
//! document and projects its items onto [`FeedEntry`] values.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::entry::FeedEntry;
use crate::error::{Error, Result};

/// Build the URL actually requested for `url`.
///
/// With a proxy the feed URL is appended to the proxy base as a path,
/// which is what CORS relays such as cors-anywhere expect.
#[must_use]
pub fn process_url(url: &str, cors_proxy: Option<&str>) -> String {
    match cors_proxy {
        Some(proxy) => format!("{}/{url}", proxy.trim_end_matches('/')),
        None => url.to_string(),
    }
}

/// Parse an RSS document into entries, keeping feed order.
///
/// # Errors
///
/// Returns [`Error::FeedParse`] if `body` is not a valid RSS document.
pub fn parse_feed(body: &[u8], url: &str) -> Result<Vec<FeedEntry>> {
    let channel =
        rss::Channel::read_from(body).map_err(|e| Error::feed_parse(url, e.to_string()))?;
    Ok(channel.items().iter().map(FeedEntry::from_item).collect())
}

/// Something that can produce the current feed entries.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable description of the source (used in logs and metadata).
    fn describe(&self) -> &str;

    /// Fetch the current entries, in feed order.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be retrieved or parsed.
    async fn fetch(&self) -> Result<Vec<FeedEntry>>;
}

/// Fetches an RSS feed over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    feed_url: String,
    request_url: String,
}

impl HttpFeedSource {
    /// Create a source for `feed_url`, optionally routed through a CORS proxy.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        feed_url: impl Into<String>,
        cors_proxy: Option<&str>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let feed_url = feed_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            request_url: process_url(&feed_url, cors_proxy),
            feed_url,
        })
    }

    /// Create a source from the `[feed]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.feed.url.clone(),
            config.cors_proxy(),
            config.request_timeout(),
            &config.feed.user_agent,
        )
    }

    /// The URL that is requested on each fetch.
    #[must_use]
    pub fn request_url(&self) -> &str {
        &self.request_url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn describe(&self) -> &str {
        &self.feed_url
    }

    async fn fetch(&self) -> Result<Vec<FeedEntry>> {
        debug!("Fetching feed from {}", self.request_url);

        let response = self.client.get(&self.request_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: self.request_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let entries = parse_feed(&body, &self.request_url)?;

        debug!("Parsed {} entries from {}", entries.len(), self.feed_url);
        Ok(entries)
    }
}
