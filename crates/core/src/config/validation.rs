//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `bind_addr` is empty
    /// - `sitemap_path` does not start with `/` or carries a query
    /// - `redirect_missing_html` does not start with `/`
    /// - an injection limit is neither -1 nor positive
    /// - a regex injection key-phrase does not compile
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.is_empty() {
            return Err(ConfigError::Missing {
                field: "bind_addr".into(),
                hint: "Set REHOST_BIND_ADDR environment variable".into(),
            });
        }

        if let Some(path) = self.sitemap_path() {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid { field: "sitemap_path".into(), reason: "must start with /".into() });
            }
            if path.contains('?') {
                return Err(ConfigError::Invalid {
                    field: "sitemap_path".into(),
                    reason: "must not contain a query".into(),
                });
            }
        }

        if let Some(target) = self.redirect_missing_html()
            && !target.starts_with('/')
        {
            return Err(ConfigError::Invalid {
                field: "redirect_missing_html".into(),
                reason: "must start with /".into(),
            });
        }

        for (index, rule) in self.injections.iter().enumerate() {
            let field = format!("injections[{index}]");
            if rule.limit == 0 || rule.limit < -1 {
                return Err(ConfigError::Invalid { field, reason: "limit must be -1 or greater than 0".into() });
            }
            if rule.regex
                && let Err(e) = regex::bytes::Regex::new(&rule.keyphrase)
            {
                return Err(ConfigError::Invalid { field, reason: format!("keyphrase is not a valid regex: {e}") });
            }
            if !rule.is_active() {
                tracing::debug!(rule = index, "injection rule has no file or key-phrase; it will be skipped");
            }
        }

        if let Some(domain) = self.custom_domain()
            && domain.contains('/')
        {
            return Err(ConfigError::Invalid {
                field: "custom_domain".into(),
                reason: "must be a bare host name".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectionRule;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_bind_addr() {
        let config = AppConfig { bind_addr: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "bind_addr"));
    }

    #[test]
    fn test_validate_relative_sitemap_path() {
        let config = AppConfig { sitemap_path: Some("sitemap.xml".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sitemap_path"));
    }

    #[test]
    fn test_validate_sitemap_path_with_query() {
        let config = AppConfig { sitemap_path: Some("/sitemap.xml?x=1".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sitemap_path"));
    }

    #[test]
    fn test_validate_redirect_target() {
        let config = AppConfig { redirect_missing_html: Some("index.html".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "redirect_missing_html"));
    }

    #[test]
    fn test_validate_zero_limit() {
        let mut rule = InjectionRule::before("a.html", "</head>");
        rule.limit = 0;
        let config = AppConfig { injections: vec![rule], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "injections[0]"));
    }

    #[test]
    fn test_validate_bad_regex() {
        let mut rule = InjectionRule::before("a.html", "<div(");
        rule.regex = true;
        let config = AppConfig { injections: vec![InjectionRule::before("b.html", "</body>"), rule], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "injections[1]"));
    }

    #[test]
    fn test_validate_literal_keyphrase_not_compiled() {
        let config = AppConfig { injections: vec![InjectionRule::before("a.html", "<div(")], ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_custom_domain() {
        let config = AppConfig { custom_domain: Some("mirror.example/".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "custom_domain"));
    }
}
