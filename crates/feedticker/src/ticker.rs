//! The polling refresh loop.
//!
//! A [`Ticker`] owns a [`FeedSource`] and an [`EntryCache`]. Each refresh
//! fetches the feed, keeps the first `limit` entries and swaps them into the
//! cache. When the fetch or the swap fails, the ticker serves whatever the
//! cache last held instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::cache::EntryCache;
use crate::config::Config;
use crate::entry::FeedEntry;
use crate::error::Result;
use crate::feed::FeedSource;

/// Where the displayed entries came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Fetched from the feed during this refresh.
    Live,
    /// Read back from the cache after a failed refresh.
    Cached,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Cached => write!(f, "cached"),
        }
    }
}

/// The entries on display after a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Entries in display order, at most `limit` of them.
    pub entries: Vec<FeedEntry>,
    /// Where the entries came from.
    pub origin: Origin,
    /// When the refresh that produced this snapshot ran.
    pub refreshed_at: DateTime<Utc>,
    /// Why the live fetch failed, for cached snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Snapshot {
    /// Whether `other` would render differently from `self`.
    ///
    /// Cache row ids are ignored, so re-caching identical entries does not
    /// count as a change.
    #[must_use]
    pub fn differs_from(&self, other: &Snapshot) -> bool {
        self.origin != other.origin
            || self.entries.len() != other.entries.len()
            || self
                .entries
                .iter()
                .zip(&other.entries)
                .any(|(a, b)| !a.same_content(b))
    }
}

/// Refresh loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerSettings {
    /// Maximum number of entries kept and displayed.
    pub limit: usize,
    /// Time between refreshes.
    pub interval: Duration,
}

impl Default for TickerSettings {
    fn default() -> Self {
        Self {
            limit: 7,
            interval: Duration::from_millis(3000),
        }
    }
}

impl From<&Config> for TickerSettings {
    fn from(config: &Config) -> Self {
        Self {
            limit: config.ticker.limit,
            interval: config.cache_interval(),
        }
    }
}

/// A cloneable handle used to stop a running [`Ticker`].
#[derive(Debug, Clone, Default)]
pub struct TickerHandle {
    stop_signal: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl TickerHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the ticker to stop after the current refresh.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Resolve once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            if self.should_stop() {
                return;
            }
            notified.await;
        }
    }
}

/// Periodically refreshes the cache from a feed source.
#[derive(Debug)]
pub struct Ticker<S> {
    source: S,
    cache: EntryCache,
    settings: TickerSettings,
    current: Option<Snapshot>,
}

impl<S: FeedSource> Ticker<S> {
    /// Create a ticker over `source` and `cache`.
    pub fn new(source: S, cache: EntryCache, settings: TickerSettings) -> Self {
        Self {
            source,
            cache,
            settings,
            current: None,
        }
    }

    /// The snapshot produced by the last successful refresh, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    /// The cache backing this ticker.
    #[must_use]
    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    /// Refresh once.
    ///
    /// On success the returned snapshot is [`Origin::Live`]. If fetching or
    /// caching fails the error is logged and the cached entries are served
    /// as an [`Origin::Cached`] snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error only if the fallback cache read fails too; the
    /// previous snapshot is then kept.
    pub async fn refresh(&mut self) -> Result<&Snapshot> {
        let refreshed_at = Utc::now();

        let snapshot = match self.refresh_live(refreshed_at).await {
            Ok(entries) => {
                info!("Refreshed {} entries from {}", entries.len(), self.source.describe());
                Snapshot {
                    entries,
                    origin: Origin::Live,
                    refreshed_at,
                    error: None,
                }
            }
            Err(err) => {
                warn!("Refresh from {} failed: {}", self.source.describe(), err);
                let entries = self
                    .cache
                    .get_recent(self.settings.limit)
                    .map_err(|cache_err| {
                        error!("Cache fallback failed: {}", cache_err);
                        cache_err
                    })?;
                debug!("Serving {} cached entries", entries.len());
                Snapshot {
                    entries,
                    origin: Origin::Cached,
                    refreshed_at,
                    error: Some(err.to_string()),
                }
            }
        };

        Ok(self.current.insert(snapshot))
    }

    async fn refresh_live(&self, refreshed_at: DateTime<Utc>) -> Result<Vec<FeedEntry>> {
        let mut entries = self.source.fetch().await?;

        entries.retain(|entry| match entry.validate() {
            Ok(()) => true,
            Err(err) => {
                warn!("Dropping feed item: {}", err);
                false
            }
        });
        entries.truncate(self.settings.limit);

        self.cache.replace(&entries)?;
        self.cache.set_last_refresh(self.source.describe(), refreshed_at)?;
        self.cache.get_recent(self.settings.limit)
    }

    /// Refresh immediately and then once per interval until `handle` is
    /// stopped.
    ///
    /// Refreshes never overlap: each one is awaited before the next tick is
    /// taken, and ticks missed while a slow refresh was running are skipped.
    /// `on_update` is called whenever the displayed entries change.
    ///
    /// Returns the number of refreshes performed.
    pub async fn run<F>(&mut self, handle: &TickerHandle, mut on_update: F) -> u64
    where
        F: FnMut(&Snapshot),
    {
        let mut timer = tokio::time::interval(self.settings.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut shown: Option<Snapshot> = None;
        let mut refreshes = 0;

        info!(
            "Ticker started: {} every {:?}, limit {}",
            self.source.describe(),
            self.settings.interval,
            self.settings.limit
        );

        loop {
            tokio::select! {
                biased;
                () = handle.stopped() => break,
                _ = timer.tick() => {}
            }

            refreshes += 1;
            match self.refresh().await {
                Ok(snapshot) => {
                    if shown.as_ref().map_or(true, |prev| snapshot.differs_from(prev)) {
                        on_update(snapshot);
                        shown = Some(snapshot.clone());
                    }
                }
                Err(err) => error!("Refresh failed with no cache to fall back on: {}", err),
            }
        }

        info!("Ticker stopped after {} refreshes", refreshes);
        refreshes
    }
}
