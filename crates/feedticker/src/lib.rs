//! `feedticker` - A polling RSS ticker with a persistent local cache
//!
//! This library fetches an RSS feed on a fixed interval, keeps the newest
//! entries in a local `SQLite` cache and falls back to that cache whenever
//! the feed cannot be fetched.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod display;
pub mod entry;
pub mod error;
pub mod feed;
pub mod logging;
pub mod ticker;

pub use cache::{CacheStats, EntryCache};
pub use config::Config;
pub use entry::FeedEntry;
pub use error::{Error, Result};
pub use feed::{FeedSource, HttpFeedSource};
pub use logging::init_logging;
pub use ticker::{Origin, Snapshot, Ticker, TickerHandle, TickerSettings};
