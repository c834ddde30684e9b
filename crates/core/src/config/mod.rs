//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REHOST_*)
//! 2. TOML config file (if REHOST_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is immutable; it is built once at startup and
//! handed to the engine behind an `Arc`.

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// How the replay engine cooperates with a CMS mounted on the same host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CmsMode {
    /// No CMS; misses go through the 404 fallback policy.
    #[default]
    Disabled,
    /// Misses are handed to the CMS.
    Enabled,
    /// Misses and the `/` homepage are handed to the CMS.
    Homepage,
    /// Misses answer a bare 404 without running the fallback policy.
    NotFound,
}

impl CmsMode {
    /// Whether unresolved requests are delegated to the CMS.
    pub fn delegates_misses(self) -> bool {
        matches!(self, CmsMode::Enabled | CmsMode::Homepage)
    }
}

/// Where injected content lands relative to the matched key-phrase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectPosition {
    Before,
    Replace,
    #[default]
    After,
}

/// A text splice applied to HTML documents at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionRule {
    /// File inside the archive root whose contents are injected.
    ///
    /// Rules with an empty file are inactive.
    #[serde(default)]
    pub file: String,

    /// Literal text (or regex when `regex` is set) to search for.
    pub keyphrase: String,

    /// Number of matches to splice; -1 for unlimited.
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Treat `keyphrase` as a regular expression.
    #[serde(default)]
    pub regex: bool,

    #[serde(default)]
    pub position: InjectPosition,
}

fn default_limit() -> i64 {
    1
}

impl InjectionRule {
    /// Rule with the defaults used by the predefined `</head>` and `</body>` hooks.
    pub fn before(file: impl Into<String>, keyphrase: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            keyphrase: keyphrase.into(),
            limit: 1,
            regex: false,
            position: InjectPosition::Before,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.file.is_empty() && !self.keyphrase.is_empty()
    }

    /// Match limit in the form the regex engine expects (0 = all).
    pub fn match_limit(&self) -> usize {
        if self.limit < 0 { 0 } else { self.limit as usize }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REHOST_*)
/// 2. TOML config file (if REHOST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP front end listens on.
    ///
    /// Set via REHOST_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory searched for a `.content.*` archive root.
    ///
    /// Set via REHOST_BASE_DIR environment variable.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Explicit archive root, relative to `base_dir` unless absolute.
    ///
    /// Set via REHOST_CONTENT_PATH environment variable.
    #[serde(default)]
    pub content_path: Option<PathBuf>,

    #[serde(default)]
    pub cms_mode: CmsMode,

    /// Serve `1px.png` for missing jpg/jpeg/gif/png/bmp requests.
    #[serde(default = "default_true")]
    pub fix_missing_images: bool,

    /// Serve `empty.css` for missing stylesheets.
    #[serde(default = "default_true")]
    pub fix_missing_css: bool,

    /// Serve `empty.js` for missing scripts.
    #[serde(default = "default_true")]
    pub fix_missing_js: bool,

    /// Serve `empty.ico` for missing favicons.
    #[serde(default = "default_true")]
    pub fix_missing_ico: bool,

    /// Redirect target for any other missing URL.
    ///
    /// Set via REHOST_REDIRECT_MISSING_HTML environment variable.
    #[serde(default = "default_redirect_missing_html")]
    pub redirect_missing_html: Option<String>,

    /// HTML injection rules, applied in order.
    #[serde(default)]
    pub injections: Vec<InjectionRule>,

    /// `Cache-Control` max-age for static assets; 0 relies on the ETag alone.
    ///
    /// Set via REHOST_CACHE_CONTROL_MAX_AGE environment variable.
    #[serde(default = "default_cache_control_max_age")]
    pub cache_control_max_age: u64,

    /// Domain the archive is served from when it differs from the original.
    ///
    /// Set via REHOST_CUSTOM_DOMAIN environment variable.
    #[serde(default)]
    pub custom_domain: Option<String>,

    /// XML sitemap path, e.g. `/sitemap.xml`.
    ///
    /// Set via REHOST_SITEMAP_PATH environment variable.
    #[serde(default)]
    pub sitemap_path: Option<String>,

    /// Record unresolved URLs in the archive's `missing` table.
    ///
    /// Set via REHOST_CATCH_MISSING environment variable.
    #[serde(default)]
    pub catch_missing: bool,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_redirect_missing_html() -> Option<String> {
    Some("/".into())
}

fn default_cache_control_max_age() -> u64 {
    2_592_000 // 30 days
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            base_dir: default_base_dir(),
            content_path: None,
            cms_mode: CmsMode::Disabled,
            fix_missing_images: true,
            fix_missing_css: true,
            fix_missing_js: true,
            fix_missing_ico: true,
            redirect_missing_html: default_redirect_missing_html(),
            injections: Vec::new(),
            cache_control_max_age: default_cache_control_max_age(),
            custom_domain: None,
            sitemap_path: None,
            catch_missing: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REHOST_`
    /// 2. TOML file from `REHOST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REHOST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REHOST_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Custom serving domain, ignoring an empty value.
    pub fn custom_domain(&self) -> Option<&str> {
        self.custom_domain.as_deref().filter(|d| !d.is_empty())
    }

    /// Sitemap path, ignoring an empty value.
    pub fn sitemap_path(&self) -> Option<&str> {
        self.sitemap_path.as_deref().filter(|p| !p.is_empty())
    }

    /// Missing-HTML redirect target, ignoring an empty value.
    pub fn redirect_missing_html(&self) -> Option<&str> {
        self.redirect_missing_html.as_deref().filter(|p| !p.is_empty())
    }

    /// `Cache-Control` max-age, if one should be sent.
    pub fn cache_max_age(&self) -> Option<u64> {
        (self.cache_control_max_age > 0).then_some(self.cache_control_max_age)
    }

    /// Injection rules that have both a source file and a key-phrase.
    pub fn active_injections(&self) -> impl Iterator<Item = &InjectionRule> {
        self.injections.iter().filter(|rule| rule.is_active())
    }
}
