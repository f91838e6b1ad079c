//! `SQLite` schema definitions for the entry cache.

/// SQL statement to create the entries table.
///
/// `id` is the store's auto-incrementing key; entries are read back in `id`
/// order, which is the order they were added.
pub const CREATE_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    pub_date TEXT,
    content TEXT NOT NULL,
    content_snippet TEXT NOT NULL
)
";

/// Non-unique index on `title`.
pub const CREATE_TITLE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_title ON entries(title)
";

/// Non-unique index on `pub_date`.
pub const CREATE_PUB_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_pub_date ON entries(pub_date)
";

/// Non-unique index on `content`.
pub const CREATE_CONTENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_content ON entries(content)
";

/// Non-unique index on `content_snippet`.
pub const CREATE_SNIPPET_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_content_snippet ON entries(content_snippet)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ENTRIES_TABLE,
    CREATE_TITLE_INDEX,
    CREATE_PUB_DATE_INDEX,
    CREATE_CONTENT_INDEX,
    CREATE_SNIPPET_INDEX,
    CREATE_METADATA_TABLE,
];
