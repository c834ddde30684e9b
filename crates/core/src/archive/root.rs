//! Archive root discovery.
//!
//! The ingestion tool writes its output to a directory named
//! `.content.<alphanumeric id>`. Unless an explicit path is configured, the
//! first such directory (in name order) under the base directory is used.

use std::path::{Path, PathBuf};

use tokio_rusqlite::rusqlite;

use crate::{AppConfig, Error};

const ROOT_PREFIX: &str = ".content.";

/// Store file used by SQLite 3.7.0 and newer.
pub const STORE_FILE: &str = "structure.db";

/// Store file kept for SQLite builds older than 3.7.0.
pub const LEGACY_STORE_FILE: &str = "structure.legacy.db";

const MODERN_SQLITE: i32 = 3_007_000;

/// Resolved location of an archive on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRoot {
    path: PathBuf,
}

impl ArchiveRoot {
    /// Locate the archive root for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::ArchiveNotFound` if no `.content.*` directory exists and
    /// no explicit path is configured, and `Error::ArchiveUnreadable` if the
    /// chosen path does not resolve to a directory.
    pub async fn locate(config: &AppConfig) -> Result<Self, Error> {
        let candidate = match config.content_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => config.base_dir.join(path),
            None => discover(&config.base_dir).await?,
        };

        let path = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|e| Error::ArchiveUnreadable(format!("{}: {e}", candidate.display())))?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Error::ArchiveUnreadable(format!("{}: {e}", path.display())))?;
        if !metadata.is_dir() {
            return Err(Error::ArchiveUnreadable(format!("{} is not a directory", path.display())));
        }

        Ok(Self { path })
    }

    /// Wrap a path that is already known to be an archive root.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file stored inside the archive.
    pub fn file(&self, folder: &str, filename: &str) -> PathBuf {
        let mut path = self.path.clone();
        if !folder.is_empty() {
            path.push(folder);
        }
        path.push(filename);
        path
    }

    /// Store file matching the linked SQLite library.
    pub fn store_path(&self) -> PathBuf {
        self.path.join(store_file_name(rusqlite::version_number()))
    }
}

/// Pick the store file for a SQLite version number (e.g. 3045001).
pub fn store_file_name(sqlite_version: i32) -> &'static str {
    if sqlite_version >= MODERN_SQLITE { STORE_FILE } else { LEGACY_STORE_FILE }
}

/// Whether a directory name follows the `.content.<id>` convention.
pub fn is_root_name(name: &str) -> bool {
    name.strip_prefix(ROOT_PREFIX)
        .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
}

async fn discover(base_dir: &Path) -> Result<PathBuf, Error> {
    let mut entries = tokio::fs::read_dir(base_dir)
        .await
        .map_err(|e| Error::ArchiveUnreadable(format!("{}: {e}", base_dir.display())))?;

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_root_name(&name) && entry.file_type().await?.is_dir() {
            names.push(name);
        }
    }

    names.sort();
    names
        .into_iter()
        .next()
        .map(|name| base_dir.join(name))
        .ok_or_else(|| Error::ArchiveNotFound(format!("no .content.* directory in {}", base_dir.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_name_pattern() {
        assert!(is_root_name(".content.a1B2c3"));
        assert!(!is_root_name(".content."));
        assert!(!is_root_name(".content.abc-def"));
        assert!(!is_root_name("content.abc"));
        assert!(!is_root_name(".content.abc.bak"));
    }

    #[test]
    fn test_store_file_by_version() {
        assert_eq!(store_file_name(3_045_001), STORE_FILE);
        assert_eq!(store_file_name(3_007_000), STORE_FILE);
        assert_eq!(store_file_name(3_006_023), LEGACY_STORE_FILE);
    }

    #[test]
    fn test_file_without_folder() {
        let root = ArchiveRoot::from_path("/srv/.content.x");
        assert_eq!(root.file("", "1px.png"), PathBuf::from("/srv/.content.x/1px.png"));
        assert_eq!(root.file("html", "a.html"), PathBuf::from("/srv/.content.x/html/a.html"));
    }

    #[tokio::test]
    async fn test_discover_first_directory() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join(".content.zzz")).unwrap();
        std::fs::create_dir(base.path().join(".content.aaa")).unwrap();
        std::fs::write(base.path().join(".content.000"), b"not a directory").unwrap();

        let config = AppConfig { base_dir: base.path().to_path_buf(), ..Default::default() };
        let root = ArchiveRoot::locate(&config).await.unwrap();
        assert!(root.path().ends_with(".content.aaa"));
    }

    #[tokio::test]
    async fn test_discover_missing() {
        let base = tempfile::tempdir().unwrap();
        let config = AppConfig { base_dir: base.path().to_path_buf(), ..Default::default() };
        let result = ArchiveRoot::locate(&config).await;
        assert!(matches!(result, Err(Error::ArchiveNotFound(_))));
    }

    #[tokio::test]
    async fn test_explicit_content_path() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("restored")).unwrap();
        let config = AppConfig {
            base_dir: base.path().to_path_buf(),
            content_path: Some(PathBuf::from("restored")),
            ..Default::default()
        };
        let root = ArchiveRoot::locate(&config).await.unwrap();
        assert!(root.path().ends_with("restored"));
    }

    #[tokio::test]
    async fn test_explicit_content_path_missing() {
        let base = tempfile::tempdir().unwrap();
        let config = AppConfig {
            base_dir: base.path().to_path_buf(),
            content_path: Some(PathBuf::from("gone")),
            ..Default::default()
        };
        let result = ArchiveRoot::locate(&config).await;
        assert!(matches!(result, Err(Error::ArchiveUnreadable(_))));
    }
}
