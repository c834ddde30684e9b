//! Per-request decision engine.
//!
//! A request moves through a fixed sequence of stages; the first stage that
//! produces an answer ends it:
//!
//! 1. CMS homepage passthrough
//! 2. canonical redirects (https, then non-www, then www)
//! 3. sitemap interception
//! 4. archive lookup, rendering the matched record
//! 5. miss handling: CMS hand-off, bare 404 or the fallback policy
//!
//! Archive root, store and settings are opened fresh for every request, so an
//! archive swapped on disk is picked up without a restart.

use std::sync::Arc;

use rehost_core::{AppConfig, ArchiveDb, ArchiveRoot, ArchiveSettings, CmsMode, Error, WwwPolicy};

use crate::fallback::FallbackPolicy;
use crate::normalize::normalize;
use crate::render::{ContentRenderer, Injection, Rendered};
use crate::request::{ReplayRequest, RequestContext, Scheme};
use crate::response::{ReplayResponse, Resolution};
use crate::sitemap::{SitemapGenerator, filter_domain};

/// Resolves requests against the configured archive.
#[derive(Debug, Clone)]
pub struct Replayer {
    config: Arc<AppConfig>,
    injections: Vec<Injection>,
}

impl Replayer {
    /// Build a replayer with the configured injection rules.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRule` if a configured rule cannot be compiled.
    pub fn new(config: Arc<AppConfig>) -> Result<Self, Error> {
        let injections = config
            .active_injections()
            .cloned()
            .map(Injection::from_rule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, injections })
    }

    /// Append an injection rule, applied after the configured ones.
    pub fn with_injection(mut self, injection: Injection) -> Self {
        self.injections.push(injection);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn injections(&self) -> &[Injection] {
        &self.injections
    }

    /// Decide how to answer a request.
    ///
    /// # Errors
    ///
    /// Fails when the archive cannot be located, opened or read, or it does
    /// not declare its original domain. Callers answer these with a 503.
    pub async fn resolve(&self, request: &ReplayRequest) -> Result<Resolution, Error> {
        let config = self.config.as_ref();

        if config.cms_mode == CmsMode::Homepage && request.request_uri == "/" {
            tracing::debug!("homepage handed to cms");
            return Ok(Resolution::Delegate);
        }

        let root = ArchiveRoot::locate(config).await?;
        let db = ArchiveDb::open(&root).await?;
        let settings = db.load_settings().await?;
        let domain = settings.require_domain()?;

        if let Some(location) = canonical_redirect(request, &settings, domain) {
            tracing::info!(url = %request.url(), location = %location, "canonical redirect");
            return Ok(ReplayResponse::moved_permanently(&location).into());
        }

        if let Some(sitemap_path) = config.sitemap_path().filter(|path| *path == request.path()) {
            let hostname = filter_domain(request, config.custom_domain(), domain);
            let response = SitemapGenerator::new(&db, sitemap_path).generate(request, &hostname).await?;
            return Ok(response.into());
        }

        let urls = normalize(request, config.custom_domain(), domain, &settings);
        let record = db.lookup(&urls.primary, &urls.alternate).await?;

        let renderer = ContentRenderer::new(config, &self.injections, &root);
        let ctx = RequestContext::new(request, &root, &urls.primary);

        match record {
            Some(record) => {
                tracing::debug!(url = %urls.primary, matched = %record.url, mimetype = %record.mimetype, "archive hit");
                match renderer.render(&record, ctx.if_none_match(), ctx.original_url).await? {
                    Rendered::Response(response) => return Ok(response.into()),
                    Rendered::MissingFile => {}
                }
            }
            None => {
                tracing::debug!(url = %urls.primary, alternate = %urls.alternate, "archive miss");
                if config.cms_mode == CmsMode::NotFound {
                    return Ok(ReplayResponse::not_found().into());
                }
                if config.cms_mode.delegates_misses() {
                    return Ok(Resolution::Delegate);
                }
            }
        }

        let response = FallbackPolicy::new(config, &renderer).respond(&ctx).await?;
        Ok(response.into())
    }
}

/// Location of the canonical form of a request, if it is not already canonical.
///
/// At most one correction is made per round trip, in a fixed order: scheme
/// first, then stripping `www.`, then adding it.
pub fn canonical_redirect(request: &ReplayRequest, settings: &ArchiveSettings, domain: &str) -> Option<String> {
    if settings.force_https && request.scheme == Scheme::Http {
        return Some(format!("https://{}{}", request.host, request.request_uri));
    }
    match settings.www_policy {
        WwwPolicy::NonWww => request
            .host
            .strip_prefix("www.")
            .map(|host| format!("{}://{host}{}", request.scheme, request.request_uri)),
        WwwPolicy::Www if request.host.eq_ignore_ascii_case(domain) => {
            Some(format!("{}://www.{domain}{}", request.scheme, request.request_uri))
        }
        _ => None,
    }
}
