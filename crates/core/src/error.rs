//! Unified error types for rehost.
//!
//! Every variant here is fatal for the request that raised it: the front end
//! answers with 503 and an `X-Error-Description` header built from
//! [`Error::description`]. Content misses are not errors and never show up here.

use tokio_rusqlite::rusqlite;

/// Unified error type for the replay engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No `.content.*` directory could be found under the base directory.
    #[error("ARCHIVE_NOT_FOUND: {0}")]
    ArchiveNotFound(String),

    /// The archive root was configured or discovered but cannot be read.
    #[error("ARCHIVE_UNREADABLE: {0}")]
    ArchiveUnreadable(String),

    /// The structure database file is missing from the archive root.
    #[error("STORE_MISSING: {0}")]
    StoreMissing(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// The settings table could not be queried.
    #[error("SETTINGS_UNAVAILABLE: {0}")]
    SettingsUnavailable(String),

    /// A required archive setting is absent.
    #[error("MISSING_SETTING: {0}")]
    MissingSetting(&'static str),

    /// An injection rule could not be compiled.
    #[error("INVALID_RULE: {0}")]
    InvalidRule(String),

    /// Filesystem error while reading captured content.
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short operator-facing description, safe to place in a response header.
    pub fn description(&self) -> &'static str {
        match self {
            Error::ArchiveNotFound(_) => "Folder .content.xxxxxxxx not found",
            Error::ArchiveUnreadable(_) => "Directory does not exist",
            Error::StoreMissing(_) => "Structure database not found",
            Error::Database(_) => "Structure database is not readable",
            Error::SettingsUnavailable(_) => "Write permission problem.",
            Error::MissingSetting(_) => "Archive settings are incomplete",
            Error::InvalidRule(_) => "Invalid custom include rule",
            Error::Io(_) => "Archive content is not readable",
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
