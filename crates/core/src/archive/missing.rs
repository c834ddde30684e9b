//! Log of URLs the archive could not answer.
//!
//! Rows are reviewed offline; the replay path only ever appends.

use super::connection::ArchiveDb;
use crate::Error;
use tokio_rusqlite::params;

impl ArchiveDb {
    /// Record an unresolved URL.
    ///
    /// Creates the `missing` table on first use. Returns whether a new row was
    /// written; a URL that is already logged is left untouched.
    pub async fn record_missing(&self, url: &str) -> Result<bool, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                conn.execute_batch(super::schema::MISSING)?;
                let inserted = conn.execute("INSERT OR IGNORE INTO missing VALUES (?1, 0, 0)", params![url])?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
