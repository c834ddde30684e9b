//! Archived resource records.
//!
//! Every row of the `structure` table describes one captured URL: either a
//! redirect rule or a file inside the archive with its MIME metadata.

use super::connection::ArchiveDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// One archived resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub url: String,
    pub hostname: String,
    pub request_uri: String,
    pub folder: String,
    pub filename: String,
    pub mimetype: String,
    pub charset: String,
    /// Redirect target; empty for content records.
    pub redirect: String,
    pub filetime: i64,
    pub enabled: bool,
}

impl ArchiveRecord {
    /// Redirect target, if this record is a redirect rule.
    pub fn redirect_target(&self) -> Option<&str> {
        Some(self.redirect.as_str()).filter(|r| !r.is_empty())
    }

    pub fn is_html(&self) -> bool {
        self.mimetype.starts_with("text/html")
    }
}

const RECORD_COLUMNS: &str =
    "url, hostname, request_uri, folder, filename, mimetype, charset, redirect, filetime, enabled";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArchiveRecord> {
    Ok(ArchiveRecord {
        url: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
        hostname: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        request_uri: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        folder: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        filename: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        mimetype: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        charset: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        redirect: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        filetime: row.get::<_, Option<i64>>(8)?.unwrap_or_default(),
        enabled: row.get::<_, Option<i64>>(9)?.unwrap_or_default() == 1,
    })
}

impl ArchiveDb {
    /// Find the active record for a URL or its alternate form.
    ///
    /// Both forms are compared case-insensitively. Among enabled matches the
    /// most recent capture wins. Returns None if nothing qualifies.
    pub async fn lookup(&self, url: &str, url_alt: &str) -> Result<Option<ArchiveRecord>, Error> {
        let url = url.to_string();
        let url_alt = url_alt.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ArchiveRecord>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM structure
                    WHERE (url = ?1 COLLATE NOCASE OR url = ?2 COLLATE NOCASE) AND enabled = 1
                    ORDER BY filetime DESC LIMIT 1"
                ))?;

                match stmt.query_row(params![url, url_alt], record_from_row) {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Count records, as (all, enabled).
    pub async fn record_counts(&self) -> Result<(u64, u64), Error> {
        self.conn
            .call(|conn| -> Result<(u64, u64), Error> {
                let counts = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(enabled = 1), 0) FROM structure",
                    [],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )?;
                Ok((counts.0 as u64, counts.1 as u64))
            })
            .await
            .map_err(Error::from)
    }
}
