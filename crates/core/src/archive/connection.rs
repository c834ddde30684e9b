//! Archive store connection management.
//!
//! The store is owned by the ingestion tool, so the replay path opens it
//! read-only and never runs migrations. The only write this crate performs is
//! the missing-URL log, which goes through a separate short-lived handle.

use std::path::Path;

use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::OpenFlags;

use super::root::ArchiveRoot;
use crate::Error;

/// Archive store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct ArchiveDb {
    pub(crate) conn: Connection,
}

impl ArchiveDb {
    /// Open the store of an archive for reading.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreMissing` if the store file does not exist and
    /// `Error::Database` if SQLite refuses to open it.
    pub async fn open(root: &ArchiveRoot) -> Result<Self, Error> {
        Self::open_with_flags(&root.store_path(), OpenFlags::SQLITE_OPEN_READ_ONLY).await
    }

    /// Open the store of an archive for the missing-URL log.
    pub async fn open_writable(root: &ArchiveRoot) -> Result<Self, Error> {
        let db = Self::open_with_flags(&root.store_path(), OpenFlags::SQLITE_OPEN_READ_WRITE).await?;

        db.conn
            .call(|conn| conn.execute_batch("PRAGMA busy_timeout = 2000;"))
            .await
            .map_err(Error::Database)?;

        Ok(db)
    }

    async fn open_with_flags(path: &Path, flags: OpenFlags) -> Result<Self, Error> {
        if !tokio::fs::try_exists(path).await? {
            return Err(Error::StoreMissing(path.display().to_string()));
        }

        let flags = flags | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .await
            .map_err(|e| Error::Database(e.into()))?;

        Ok(Self { conn })
    }

    /// Version string of the linked SQLite library.
    pub async fn sqlite_version(&self) -> Result<String, Error> {
        self.conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .map_err(Error::Database)
    }
}
