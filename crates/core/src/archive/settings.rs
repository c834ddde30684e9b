//! Typed view of the archive `settings` table.

use super::connection::ArchiveDb;
use crate::Error;

/// Canonical subdomain policy of the archived site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WwwPolicy {
    /// Serve whichever host was requested.
    #[default]
    Preserve,
    /// Canonical host is `www.<domain>`.
    Www,
    /// Canonical host is the bare domain.
    NonWww,
}

/// Settings written by the ingestion tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSettings {
    /// Domain the site was captured from.
    pub domain: Option<String>,
    pub force_https: bool,
    pub www_policy: WwwPolicy,
    /// Raw `www` flag, set even when `non-www` overrides the redirect policy.
    pub www: bool,
}

/// Settings values are flags when non-empty and not "0".
fn is_set(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

impl ArchiveSettings {
    /// Build settings from `(param, value)` rows. Unknown params are ignored.
    ///
    /// When both `non-www` and `www` are set, `non-www` wins the redirect
    /// policy while the raw `www` flag is kept for host rewriting.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        let mut non_www = false;

        for (param, value) in pairs {
            let value = value.as_ref();
            match param.as_ref() {
                "domain" if !value.is_empty() => settings.domain = Some(value.to_string()),
                "https" => settings.force_https = is_set(value),
                "www" => settings.www = is_set(value),
                "non-www" => non_www = is_set(value),
                _ => {}
            }
        }

        settings.www_policy = if non_www {
            WwwPolicy::NonWww
        } else if settings.www {
            WwwPolicy::Www
        } else {
            WwwPolicy::Preserve
        };

        settings
    }

    /// The original domain, which every archive must declare.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingSetting` if the ingestion tool did not record one.
    pub fn require_domain(&self) -> Result<&str, Error> {
        self.domain.as_deref().ok_or(Error::MissingSetting("domain"))
    }

    /// Whether foreign hosts are rewritten to `www.<domain>` for lookups.
    pub fn prefers_www(&self) -> bool {
        self.www
    }
}

impl ArchiveDb {
    /// Load the settings table.
    ///
    /// # Errors
    ///
    /// Returns `Error::SettingsUnavailable` if the table cannot be queried,
    /// which usually means the store is unreadable by the serving user.
    pub async fn load_settings(&self) -> Result<ArchiveSettings, Error> {
        self.conn
            .call(|conn| -> Result<ArchiveSettings, Error> {
                let unavailable = |e: tokio_rusqlite::rusqlite::Error| Error::SettingsUnavailable(e.to_string());

                let mut stmt = conn.prepare("SELECT param, value FROM settings").map_err(unavailable)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                            row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        ))
                    })
                    .map_err(unavailable)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(unavailable)?;

                Ok(ArchiveSettings::from_pairs(rows))
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::fixture::ArchiveFixture;

    #[test]
    fn test_from_pairs() {
        let settings = ArchiveSettings::from_pairs([("domain", "example.com"), ("https", "1"), ("www", "1")]);
        assert_eq!(settings.domain.as_deref(), Some("example.com"));
        assert!(settings.force_https);
        assert_eq!(settings.www_policy, WwwPolicy::Www);
        assert!(settings.prefers_www());
    }

    #[test]
    fn test_zero_and_empty_flags_unset() {
        let settings = ArchiveSettings::from_pairs([("https", "0"), ("www", ""), ("non-www", "0")]);
        assert!(!settings.force_https);
        assert_eq!(settings.www_policy, WwwPolicy::Preserve);
    }

    #[test]
    fn test_non_www_precedence() {
        let settings = ArchiveSettings::from_pairs([("www", "1"), ("non-www", "1")]);
        assert_eq!(settings.www_policy, WwwPolicy::NonWww);
        assert!(settings.prefers_www());
    }

    #[test]
    fn test_require_domain_missing() {
        let settings = ArchiveSettings::from_pairs([("domain", "")]);
        assert!(matches!(settings.require_domain(), Err(Error::MissingSetting("domain"))));
    }

    #[tokio::test]
    async fn test_load_settings() {
        let fixture = ArchiveFixture::new("example.com");
        fixture.setting("https", "1");
        fixture.setting("non-www", "1");

        let db = ArchiveDb::open(&fixture.archive_root()).await.unwrap();
        let settings = db.load_settings().await.unwrap();
        assert_eq!(settings.require_domain().unwrap(), "example.com");
        assert!(settings.force_https);
        assert_eq!(settings.www_policy, WwwPolicy::NonWww);
    }

    #[tokio::test]
    async fn test_load_settings_without_table() {
        let fixture = ArchiveFixture::new("example.com");
        fixture.execute("DROP TABLE settings");

        let db = ArchiveDb::open(&fixture.archive_root()).await.unwrap();
        let result = db.load_settings().await;
        assert!(matches!(result, Err(Error::SettingsUnavailable(_))));
    }
}
