//! Store layout.
//!
//! `structure` and `settings` are written by the ingestion tool and only read
//! here; their definitions are kept to build archives for tests. `missing` is
//! the one table the replay path creates.

/// Captured resources.
pub const STRUCTURE: &str = "CREATE TABLE IF NOT EXISTS structure (
    url TEXT NOT NULL,
    protocol TEXT,
    hostname TEXT,
    request_uri TEXT,
    folder TEXT,
    filename TEXT,
    mimetype TEXT,
    charset TEXT,
    filesize INTEGER,
    filetime INTEGER,
    enabled INTEGER NOT NULL DEFAULT 1,
    redirect TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS structure_url ON structure (url COLLATE NOCASE);";

/// Archive-wide settings as `param`/`value` pairs.
pub const SETTINGS: &str = "CREATE TABLE IF NOT EXISTS settings (
    param TEXT PRIMARY KEY,
    value TEXT
);";

/// Unresolved URLs awaiting review.
pub const MISSING: &str = "CREATE TABLE IF NOT EXISTS missing (
    url TEXT PRIMARY KEY,
    status INTEGER,
    ignore INTEGER
);";
