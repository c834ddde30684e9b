//! Throwaway archives for tests.
//!
//! Builds a base directory containing a `.content.fixture` root with an empty
//! store, the way the ingestion tool lays one out. Enabled for downstream crates
//! through the `fixtures` feature.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::Connection;

use super::records::ArchiveRecord;
use super::root::ArchiveRoot;
use super::schema;
use crate::AppConfig;

/// Name of the archive root inside the fixture base directory.
pub const FIXTURE_ROOT: &str = ".content.fixture";

/// Default capture time of fixture records.
pub const FIXTURE_FILETIME: i64 = 20200101000000;

/// A temporary archive on disk.
pub struct ArchiveFixture {
    base: TempDir,
    root: PathBuf,
}

impl ArchiveFixture {
    /// Create an archive whose original domain is `domain`.
    pub fn new(domain: &str) -> Self {
        let base = tempfile::tempdir().expect("create fixture base dir");
        let root = base.path().join(FIXTURE_ROOT);
        std::fs::create_dir(&root).expect("create fixture root");

        let fixture = Self { base, root };
        fixture.execute(schema::STRUCTURE);
        fixture.execute(schema::SETTINGS);
        fixture.setting("domain", domain);
        fixture
    }

    pub fn base_dir(&self) -> &Path {
        self.base.path()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_root(&self) -> ArchiveRoot {
        ArchiveRoot::from_path(&self.root)
    }

    /// Default configuration pointed at this archive.
    pub fn config(&self) -> AppConfig {
        AppConfig { base_dir: self.base_dir().to_path_buf(), ..Default::default() }
    }

    fn connect(&self) -> Connection {
        Connection::open(self.archive_root().store_path()).expect("open fixture store")
    }

    /// Run a raw SQL batch against the store.
    pub fn execute(&self, sql: &str) {
        self.connect().execute_batch(sql).expect("execute fixture sql");
    }

    pub fn setting(&self, param: &str, value: &str) -> &Self {
        self.connect()
            .execute(
                "INSERT INTO settings (param, value) VALUES (?1, ?2)
                ON CONFLICT(param) DO UPDATE SET value = excluded.value",
                params![param, value],
            )
            .expect("write fixture setting");
        self
    }

    pub fn insert(&self, record: &ArchiveRecord) -> &Self {
        self.insert_many(std::iter::once(record.clone()));
        self
    }

    /// Insert records in a single transaction.
    pub fn insert_many(&self, records: impl IntoIterator<Item = ArchiveRecord>) {
        let mut conn = self.connect();
        let tx = conn.transaction().expect("begin fixture transaction");
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO structure (
                    url, protocol, hostname, request_uri, folder, filename,
                    mimetype, charset, filesize, filetime, enabled, redirect
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?11)",
                )
                .expect("prepare fixture insert");
            for record in records {
                let protocol = record.url.split("://").next().unwrap_or("http").to_string();
                stmt.execute(params![
                    record.url,
                    protocol,
                    record.hostname,
                    record.request_uri,
                    record.folder,
                    record.filename,
                    record.mimetype,
                    record.charset,
                    record.filetime,
                    record.enabled as i32,
                    record.redirect,
                ])
                .expect("insert fixture record");
            }
        }
        tx.commit().expect("commit fixture records");
    }

    /// Write a captured body (or placeholder) relative to the archive root.
    pub fn write_file(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture folder");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Write the body of a record to where the renderer expects it.
    pub fn write_record_file(&self, record: &ArchiveRecord, contents: &[u8]) -> PathBuf {
        let relative = if record.folder.is_empty() {
            record.filename.clone()
        } else {
            format!("{}/{}", record.folder, record.filename)
        };
        self.write_file(&relative, contents)
    }

    /// URLs in the missing-URL log, sorted.
    pub fn missing_urls(&self) -> Vec<String> {
        let conn = self.connect();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'missing')",
                [],
                |row| row.get(0),
            )
            .expect("inspect fixture schema");
        if !exists {
            return Vec::new();
        }
        let mut stmt = conn.prepare("SELECT url FROM missing ORDER BY url").expect("prepare missing query");
        stmt.query_map([], |row| row.get(0))
            .expect("query missing urls")
            .collect::<Result<Vec<String>, _>>()
            .expect("read missing urls")
    }
}

/// Split an absolute URL into `(hostname, request_uri)`.
fn split_url(url: &str) -> (String, String) {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    match rest.find(['/', '?']) {
        Some(index) => (rest[..index].to_string(), rest[index..].to_string()),
        None => (rest.to_string(), "/".to_string()),
    }
}

/// Enabled `text/html` record stored under the `html` folder.
pub fn html_record(url: &str, filename: &str) -> ArchiveRecord {
    let (hostname, request_uri) = split_url(url);
    ArchiveRecord {
        url: url.to_string(),
        hostname,
        request_uri,
        folder: "html".to_string(),
        filename: filename.to_string(),
        mimetype: "text/html".to_string(),
        charset: "utf-8".to_string(),
        redirect: String::new(),
        filetime: FIXTURE_FILETIME,
        enabled: true,
    }
}

/// Enabled record of an arbitrary MIME type stored under the `assets` folder.
pub fn asset_record(url: &str, filename: &str, mimetype: &str) -> ArchiveRecord {
    ArchiveRecord {
        folder: "assets".to_string(),
        mimetype: mimetype.to_string(),
        charset: if mimetype.starts_with("image/") { "binary" } else { "utf-8" }.to_string(),
        ..html_record(url, filename)
    }
}

/// Redirect rule from `url` to `target`.
pub fn redirect_record(url: &str, target: &str) -> ArchiveRecord {
    ArchiveRecord { folder: String::new(), filename: String::new(), redirect: target.to_string(), ..html_record(url, "") }
}
