//! Sitemap page queries.
//!
//! A sitemap page is an enabled, non-redirect `text/html` record of a given
//! host. Pages are listed by `request_uri` so pagination is stable.

use super::connection::ArchiveDb;
use crate::Error;
use tokio_rusqlite::params;

const PAGE_FILTER: &str = "hostname = ?1 AND mimetype = 'text/html' AND enabled = 1 AND redirect = ''";

impl ArchiveDb {
    /// Number of sitemap pages captured for a host.
    pub async fn count_pages(&self, hostname: &str) -> Result<u64, Error> {
        let hostname = hostname.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM structure WHERE {PAGE_FILTER}"),
                    params![hostname],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Request URIs of a host's sitemap pages, ordered ascending.
    ///
    /// `window` is `(limit, offset)`; `None` lists every page.
    pub async fn list_pages(&self, hostname: &str, window: Option<(u64, u64)>) -> Result<Vec<String>, Error> {
        let hostname = hostname.to_string();
        // SQLite treats a negative LIMIT as unbounded
        let (limit, offset) = window.map_or((-1, 0), |(limit, offset)| (limit as i64, offset as i64));
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT request_uri FROM structure WHERE {PAGE_FILTER}
                    ORDER BY request_uri LIMIT ?2 OFFSET ?3"
                ))?;
                let pages = stmt
                    .query_map(params![hostname, limit, offset], |row| {
                        Ok(row.get::<_, Option<String>>(0)?.unwrap_or_default())
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(pages)
            })
            .await
            .map_err(Error::from)
    }
}
