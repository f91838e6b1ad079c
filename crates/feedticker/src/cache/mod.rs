//! Persistent entry cache for feedticker.
//!
//! This module provides `SQLite`-based storage for the most recently fetched
//! feed entries. The cache holds a single object store whose records keep
//! the order they were added in, plus a small metadata table recording when
//! and from where the cache was last refreshed.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::entry::FeedEntry;
use crate::error::{Error, Result};

const LAST_REFRESH_KEY: &str = "last_refresh";
const FEED_URL_KEY: &str = "feed_url";

/// Cache of feed entries.
#[derive(Debug)]
pub struct EntryCache {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl EntryCache {
    /// Open or create a cache database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening cache at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Cache opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add an entry and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the entry lacks a required field,
    /// or a database error if the insert fails.
    pub fn add(&self, entry: &FeedEntry) -> Result<i64> {
        entry.validate()?;
        Self::insert(&self.conn, entry)
    }

    fn insert(conn: &Connection, entry: &FeedEntry) -> Result<i64> {
        conn.execute(
            r"
            INSERT INTO entries (title, pub_date, content, content_snippet)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                entry.title,
                entry.pub_date,
                entry.content,
                entry.content_snippet
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Cached entry {} ({})", id, entry.title);
        Ok(id)
    }

    /// Get every cached entry in the order it was added.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_all(&self) -> Result<Vec<FeedEntry>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, title, pub_date, content, content_snippet
            FROM entries ORDER BY id ASC
            ",
        )?;

        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Get at most `limit` entries, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_recent(&self, limit: usize) -> Result<Vec<FeedEntry>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, title, pub_date, content, content_snippet
            FROM entries ORDER BY id ASC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map([limit_i64], Self::row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Remove every cached entry.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<usize> {
        let affected = self.conn.execute("DELETE FROM entries", [])?;
        debug!("Cleared {} cached entries", affected);
        Ok(affected)
    }

    /// Swap the cache contents for `entries` in one transaction.
    ///
    /// Every entry is validated before anything is touched, so a rejected
    /// batch leaves the previous contents in place.
    ///
    /// Returns the number of entries stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if any entry is incomplete, or a
    /// database error if the swap fails (in which case it is rolled back).
    pub fn replace(&self, entries: &[FeedEntry]) -> Result<usize> {
        for entry in entries {
            entry.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        for entry in entries {
            Self::insert(&tx, entry)?;
        }
        tx.commit()?;

        info!("Cache now holds {} entries", entries.len());
        Ok(entries.len())
    }

    /// Count cached entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Record a successful refresh from `feed_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_last_refresh(&self, feed_url: &str, at: DateTime<Utc>) -> Result<()> {
        self.set_metadata(LAST_REFRESH_KEY, &at.to_rfc3339())?;
        self.set_metadata(FEED_URL_KEY, feed_url)
    }

    /// When the cache was last refreshed from the network, if ever.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn last_refresh(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .get_metadata(LAST_REFRESH_KEY)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Get cache statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<CacheStats> {
        let total_entries = self.count()?;
        let last_refresh = self.last_refresh()?;
        let feed_url = self.get_metadata(FEED_URL_KEY)?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(CacheStats {
            total_entries,
            last_refresh,
            feed_url,
            db_size_bytes,
        })
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<FeedEntry> {
        Ok(FeedEntry {
            id: Some(row.get(0)?),
            title: row.get(1)?,
            pub_date: row.get(2)?,
            content: row.get(3)?,
            content_snippet: row.get(4)?,
        })
    }
}

/// Statistics about the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently cached.
    pub total_entries: i64,
    /// Time of the last successful refresh.
    pub last_refresh: Option<DateTime<Utc>>,
    /// Feed the cached entries came from.
    pub feed_url: Option<String>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_cache() -> EntryCache {
        EntryCache::open_in_memory().expect("failed to create test cache")
    }

    fn entry(title: &str) -> FeedEntry {
        FeedEntry::new(
            title,
            Some("Mon, 01 Jan 2024 00:00:00 GMT".to_string()),
            format!("<p>{title} body</p>"),
        )
    }

    #[test]
    fn test_open_in_memory() {
        assert!(EntryCache::open_in_memory().is_ok());
    }

    #[test]
    fn test_add_and_get_all() {
        let cache = create_test_cache();

        let id = cache.add(&entry("First")).unwrap();
        assert!(id > 0);

        let all = cache.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, Some(id));
        assert_eq!(all[0].title, "First");
        assert_eq!(all[0].content_snippet, "First body");
    }

    #[test]
    fn test_add_rejects_missing_title() {
        let cache = create_test_cache();
        let err = cache.add(&entry("")).unwrap_err();
        assert!(err.is_missing_field());
        assert_eq!(cache.count().unwrap(), 0);
    }

    #[test]
    fn test_get_all_preserves_insertion_order() {
        let cache = create_test_cache();
        for title in ["Zulu", "Alpha", "Mike"] {
            cache.add(&entry(title)).unwrap();
        }

        let titles: Vec<_> = cache.get_all().unwrap().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, ["Zulu", "Alpha", "Mike"]);
    }

    #[test]
    fn test_get_recent_is_bounded() {
        let cache = create_test_cache();
        for i in 0..5 {
            cache.add(&entry(&format!("Entry {i}"))).unwrap();
        }

        let recent = cache.get_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].title, "Entry 0");
        assert!(cache.get_recent(0).unwrap().is_empty());
    }

    #[test]
    fn test_null_pub_date_round_trips() {
        let cache = create_test_cache();
        cache.add(&FeedEntry::new("No date", None, "body")).unwrap();
        assert!(cache.get_all().unwrap()[0].pub_date.is_none());
    }

    #[test]
    fn test_clear() {
        let cache = create_test_cache();
        cache.add(&entry("One")).unwrap();
        cache.add(&entry("Two")).unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.count().unwrap(), 0);
        assert_eq!(cache.clear().unwrap(), 0);
    }

    #[test]
    fn test_replace_swaps_contents() {
        let cache = create_test_cache();
        cache.add(&entry("Old")).unwrap();

        let stored = cache.replace(&[entry("New 1"), entry("New 2")]).unwrap();
        assert_eq!(stored, 2);

        let titles: Vec<_> = cache.get_all().unwrap().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, ["New 1", "New 2"]);
    }

    #[test]
    fn test_replace_with_invalid_entry_keeps_previous_contents() {
        let cache = create_test_cache();
        cache.add(&entry("Keep me")).unwrap();

        let err = cache.replace(&[entry("Fine"), entry("")]).unwrap_err();
        assert!(err.is_missing_field());

        let all = cache.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Keep me");
    }

    #[test]
    fn test_replace_with_empty_batch_empties_cache() {
        let cache = create_test_cache();
        cache.add(&entry("Gone")).unwrap();

        assert_eq!(cache.replace(&[]).unwrap(), 0);
        assert_eq!(cache.count().unwrap(), 0);
    }

    #[test]
    fn test_last_refresh_round_trip() {
        let cache = create_test_cache();
        assert!(cache.last_refresh().unwrap().is_none());

        let at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        cache.set_last_refresh("http://example.com/rss.xml", at).unwrap();

        assert_eq!(cache.last_refresh().unwrap(), Some(at));
        let stats = cache.stats().unwrap();
        assert_eq!(stats.feed_url.as_deref(), Some("http://example.com/rss.xml"));
        assert_eq!(stats.last_refresh, Some(at));
    }

    #[test]
    fn test_stats_empty() {
        let cache = create_test_cache();
        let stats = cache.stats().unwrap();

        assert_eq!(stats.total_entries, 0);
        assert!(stats.last_refresh.is_none());
        assert!(stats.feed_url.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_path() {
        let cache = create_test_cache();
        assert_eq!(cache.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_open_file_based_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cache.db");

        {
            let cache = EntryCache::open(&db_path).unwrap();
            cache.replace(&[entry("Persisted")]).unwrap();
            assert_eq!(cache.path(), db_path);
            assert!(cache.stats().unwrap().db_size_bytes > 0);
        }

        let reopened = EntryCache::open(&db_path).unwrap();
        let all = reopened.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Persisted");
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/cache.db");

        let _cache = EntryCache::open(&nested).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_unicode_content() {
        let cache = create_test_cache();
        cache.add(&FeedEntry::new("世界 🌍", None, "مرحبا")).unwrap();

        let all = cache.get_all().unwrap();
        assert_eq!(all[0].title, "世界 🌍");
        assert_eq!(all[0].content, "مرحبا");
    }
}
