//! Error types for feedticker.
//!
//! This module defines all error types used throughout the feedticker crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for feedticker operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Cache Errors ===
    /// Failed to open or create the cache database.
    #[error("failed to open cache database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// An entry is missing a field the cache requires.
    #[error("entry is missing required field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Fetch Errors ===
    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed server answered with a non-success status.
    #[error("HTTP {status} when fetching {url}")]
    HttpStatus {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not a readable RSS document.
    #[error("failed to parse feed from {url}: {message}")]
    FeedParse {
        /// The URL the body came from.
        url: String,
        /// Parser message.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for feedticker operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a missing field error.
    #[must_use]
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Create a feed parse error.
    #[must_use]
    pub fn feed_parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FeedParse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Check if this error came from fetching or parsing the feed.
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::HttpStatus { .. } | Self::FeedParse { .. }
        )
    }

    /// Check if this error is a rejected entry.
    #[must_use]
    pub fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }
}
