//! What to answer when the archive has nothing for a request.
//!
//! Assets the page layout depends on are replaced by neutral placeholders
//! stored in the archive root, so a missing image or stylesheet does not break
//! the rest of the page. Anything else is redirected or gets a bare 404.

use rehost_core::{AppConfig, ArchiveDb, ArchiveRecord, Error};

use crate::render::{ContentRenderer, Rendered};
use crate::request::RequestContext;
use crate::response::ReplayResponse;

/// A neutral stand-in for a missing asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub filename: &'static str,
    pub mimetype: &'static str,
    pub charset: &'static str,
}

pub const IMAGE_PLACEHOLDER: Placeholder = Placeholder { filename: "1px.png", mimetype: "image/png", charset: "binary" };
pub const ICON_PLACEHOLDER: Placeholder =
    Placeholder { filename: "empty.ico", mimetype: "image/x-icon", charset: "binary" };
pub const CSS_PLACEHOLDER: Placeholder = Placeholder { filename: "empty.css", mimetype: "text/css", charset: "utf-8" };
pub const JS_PLACEHOLDER: Placeholder =
    Placeholder { filename: "empty.js", mimetype: "application/javascript", charset: "utf-8" };

impl Placeholder {
    /// Record describing the placeholder file in the archive root.
    fn record(&self) -> ArchiveRecord {
        ArchiveRecord {
            filename: self.filename.to_string(),
            mimetype: self.mimetype.to_string(),
            charset: self.charset.to_string(),
            enabled: true,
            ..Default::default()
        }
    }
}

/// Placeholder for a request path, honoring the per-type toggles.
pub fn placeholder_for(config: &AppConfig, path: &str) -> Option<Placeholder> {
    let extension = extension(path)?;
    match extension.as_str() {
        "jpg" | "jpeg" | "gif" | "png" | "bmp" if config.fix_missing_images => Some(IMAGE_PLACEHOLDER),
        "ico" if config.fix_missing_ico => Some(ICON_PLACEHOLDER),
        "css" if config.fix_missing_css => Some(CSS_PLACEHOLDER),
        "js" if config.fix_missing_js => Some(JS_PLACEHOLDER),
        _ => None,
    }
}

/// Lower-cased extension of the last path segment.
fn extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (stem, extension) = segment.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

/// Fallback chain for unresolved requests.
pub struct FallbackPolicy<'a> {
    config: &'a AppConfig,
    renderer: &'a ContentRenderer<'a>,
}

impl<'a> FallbackPolicy<'a> {
    pub fn new(config: &'a AppConfig, renderer: &'a ContentRenderer<'a>) -> Self {
        Self { config, renderer }
    }

    /// Decide the response for a request the archive could not answer.
    pub async fn respond(&self, ctx: &RequestContext<'_>) -> Result<ReplayResponse, Error> {
        if self.config.catch_missing {
            log_missing(ctx).await;
        }

        if let Some(placeholder) = placeholder_for(self.config, ctx.request.path()) {
            let record = placeholder.record();
            return match self.renderer.render(&record, ctx.if_none_match(), ctx.original_url).await? {
                Rendered::Response(response) => {
                    tracing::debug!(url = %ctx.original_url, placeholder = placeholder.filename, "serving placeholder");
                    Ok(response)
                }
                Rendered::MissingFile => {
                    tracing::warn!(placeholder = placeholder.filename, "placeholder file is missing from the archive");
                    Ok(ReplayResponse::not_found())
                }
            };
        }

        if let Some(target) = self.config.redirect_missing_html().filter(|t| *t != ctx.request.request_uri) {
            tracing::info!(url = %ctx.original_url, location = target, "redirecting missing page");
            return Ok(ReplayResponse::moved_permanently(target));
        }

        Ok(ReplayResponse::not_found())
    }
}

/// Append the original URL to the missing log. Failures only warn.
async fn log_missing(ctx: &RequestContext<'_>) {
    let result = match ArchiveDb::open_writable(ctx.archive_root).await {
        Ok(db) => db.record_missing(ctx.original_url).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(inserted) => tracing::debug!(url = %ctx.original_url, inserted, "recorded missing url"),
        Err(e) => tracing::warn!(url = %ctx.original_url, error = %e, "could not record missing url"),
    }
}
