//! Rendering of archived records.
//!
//! ### Headers
//! - `Content-Type` from the record, with the charset for text-like types.
//! - Static assets get a content-hash `Etag`, an optional `Cache-Control`, and
//!   a bodiless 304 when `If-None-Match` carries the same tag.
//!
//! ### Bodies
//! - HTML is buffered so injection rules can rewrite it; `Content-Length`
//!   reflects the final document.
//! - Everything else streams straight from disk.

pub mod inject;

pub use inject::{CallbackSource, ContentSource, FileSource, Injection, InjectionContext};

use std::path::Path;

use bytes::Bytes;
use http::StatusCode;
use http::header;
use rehost_core::archive::hash::file_hash;
use rehost_core::{AppConfig, ArchiveRecord, ArchiveRoot, Error};

use crate::response::{ReplayBody, ReplayResponse};

/// MIME types whose `Content-Type` carries the record charset.
const CHARSET_TYPES: &[&str] =
    &["text/html", "text/css", "text/xml", "application/javascript", "application/x-javascript"];

/// MIME types served with an entity tag.
const CACHEABLE_TYPES: &[&str] = &[
    "application/x-javascript",
    "application/font-woff",
    "application/javascript",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/svg+xml",
    "image/tiff",
    "image/webp",
    "image/x-icon",
    "image/x-ms-bmp",
    "text/css",
    "text/javascript",
];

/// Result of rendering a record.
#[derive(Debug)]
pub enum Rendered {
    Response(ReplayResponse),
    /// The record points at a file that is not in the archive.
    MissingFile,
}

/// Renders records of one archive for one request.
pub struct ContentRenderer<'a> {
    config: &'a AppConfig,
    injections: &'a [Injection],
    archive_root: &'a ArchiveRoot,
}

impl<'a> ContentRenderer<'a> {
    pub fn new(config: &'a AppConfig, injections: &'a [Injection], archive_root: &'a ArchiveRoot) -> Self {
        Self { config, injections, archive_root }
    }

    /// Render a record.
    ///
    /// `if_none_match` is the client's validator; `original_url` is handed to
    /// injection sources.
    pub async fn render(
        &self, record: &ArchiveRecord, if_none_match: Option<&str>, original_url: &str,
    ) -> Result<Rendered, Error> {
        if let Some(target) = record.redirect_target() {
            return Ok(Rendered::Response(ReplayResponse::moved_permanently(target)));
        }

        let path = self.archive_root.file(&record.folder, &record.filename);
        if !is_file(&path).await {
            tracing::debug!(url = %record.url, path = %path.display(), "archived file is missing");
            return Ok(Rendered::MissingFile);
        }

        let mut response = ReplayResponse::new(StatusCode::OK).with_header(header::CONTENT_TYPE, &content_type(record));

        if is_cacheable(&record.mimetype) {
            let etag = format!("\"{}\"", file_hash(&path).await?);
            response = response.with_header(header::ETAG, &etag);
            if let Some(max_age) = self.config.cache_max_age() {
                response = response.with_header(header::CACHE_CONTROL, &format!("public, max-age={max_age}"));
            }
            if if_none_match.is_some_and(|validator| validator_matches(validator, &etag)) {
                response.status = StatusCode::NOT_MODIFIED;
                return Ok(Rendered::Response(response));
            }
        }

        if record.is_html() {
            let mut document = tokio::fs::read(&path).await?;
            for injection in self.injections {
                document = injection.apply(document, self.archive_root, original_url).await;
            }
            response = response
                .with_header(header::CONTENT_LENGTH, &document.len().to_string())
                .with_body(ReplayBody::Full(Bytes::from(document)));
        } else {
            let file = tokio::fs::File::open(&path).await?;
            response = response.with_body(ReplayBody::File(file));
        }

        Ok(Rendered::Response(response))
    }
}

/// `Content-Type` value for a record.
pub fn content_type(record: &ArchiveRecord) -> String {
    if CHARSET_TYPES.contains(&record.mimetype.as_str()) && !record.charset.is_empty() {
        format!("{}; charset={}", record.mimetype, record.charset)
    } else {
        record.mimetype.clone()
    }
}

pub fn is_cacheable(mimetype: &str) -> bool {
    CACHEABLE_TYPES.contains(&mimetype)
}

/// Whether a client validator names `etag`; the bare digest is accepted too.
fn validator_matches(validator: &str, etag: &str) -> bool {
    let validator = validator.trim();
    validator == etag || validator == etag.trim_matches('"')
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehost_core::archive::fixture::{ArchiveFixture, asset_record, html_record, redirect_record};
    use rehost_core::archive::hash::content_hash;
    use rehost_core::{InjectPosition, InjectionRule};

    async fn render(
        fixture: &ArchiveFixture, config: &AppConfig, injections: &[Injection], record: &ArchiveRecord,
        if_none_match: Option<&str>,
    ) -> Rendered {
        let root = fixture.archive_root();
        ContentRenderer::new(config, injections, &root)
            .render(record, if_none_match, &record.url)
            .await
            .unwrap()
    }

    fn response(rendered: Rendered) -> ReplayResponse {
        match rendered {
            Rendered::Response(response) => response,
            Rendered::MissingFile => panic!("expected a response"),
        }
    }

    #[test]
    fn test_content_type_charset() {
        let html = html_record("http://example.com/", "index.html");
        assert_eq!(content_type(&html), "text/html; charset=utf-8");

        let png = asset_record("http://example.com/a.png", "a.png", "image/png");
        assert_eq!(content_type(&png), "image/png");

        let mut js = asset_record("http://example.com/a.js", "a.js", "application/javascript");
        js.charset = "windows-1251".into();
        assert_eq!(content_type(&js), "application/javascript; charset=windows-1251");
    }

    #[test]
    fn test_cacheable_types() {
        assert!(is_cacheable("image/png"));
        assert!(is_cacheable("text/css"));
        assert!(!is_cacheable("text/html"));
        assert!(!is_cacheable("application/pdf"));
    }

    #[tokio::test]
    async fn test_redirect_record() {
        let fixture = ArchiveFixture::new("example.com");
        let mut record = redirect_record("http://example.com/old", "http://example.com/new");
        record.mimetype = "image/png".into();
        record.filename = "whatever.png".into();
        let rendered = render(&fixture, &AppConfig::default(), &[], &record, None).await;
        let response = response(rendered);
        assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header(header::LOCATION), Some("http://example.com/new"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let fixture = ArchiveFixture::new("example.com");
        let record = html_record("http://example.com/", "index.html");
        let rendered = render(&fixture, &AppConfig::default(), &[], &record, None).await;
        assert!(matches!(rendered, Rendered::MissingFile));
    }

    #[tokio::test]
    async fn test_etag_and_cache_control() {
        let fixture = ArchiveFixture::new("example.com");
        let record = asset_record("http://example.com/a.css", "a.css", "text/css");
        fixture.write_record_file(&record, b"p { margin: 0 }");
        let expected = format!("\"{}\"", content_hash(b"p { margin: 0 }"));

        let response = response(render(&fixture, &AppConfig::default(), &[], &record, None).await);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header(header::ETAG), Some(expected.as_str()));
        assert_eq!(response.header(header::CACHE_CONTROL), Some("public, max-age=2592000"));
        assert_eq!(response.header(header::CONTENT_TYPE), Some("text/css; charset=utf-8"));
        assert_eq!(response.body.into_bytes().await.unwrap().as_ref(), b"p { margin: 0 }");
    }

    #[tokio::test]
    async fn test_no_cache_control_when_zero() {
        let fixture = ArchiveFixture::new("example.com");
        let record = asset_record("http://example.com/a.png", "a.png", "image/png");
        fixture.write_record_file(&record, b"png");
        let config = AppConfig { cache_control_max_age: 0, ..Default::default() };

        let response = response(render(&fixture, &config, &[], &record, None).await);
        assert!(response.header(header::ETAG).is_some());
        assert!(response.header(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn test_conditional_request() {
        let fixture = ArchiveFixture::new("example.com");
        let record = asset_record("http://example.com/a.png", "a.png", "image/png");
        fixture.write_record_file(&record, b"\x89PNG fake");
        let etag = format!("\"{}\"", content_hash(b"\x89PNG fake"));
        let config = AppConfig::default();

        let matched = response(render(&fixture, &config, &[], &record, Some(&etag)).await);
        assert_eq!(matched.status, StatusCode::NOT_MODIFIED);
        assert!(matched.body.is_empty());

        let bare = etag.trim_matches('"').to_string();
        let matched_bare = response(render(&fixture, &config, &[], &record, Some(&bare)).await);
        assert_eq!(matched_bare.status, StatusCode::NOT_MODIFIED);

        let mismatched = response(render(&fixture, &config, &[], &record, Some("\"stale\"")).await);
        assert_eq!(mismatched.status, StatusCode::OK);
        assert_eq!(mismatched.header(header::ETAG), Some(etag.as_str()));
        assert!(!mismatched.body.is_empty());
    }

    #[tokio::test]
    async fn test_html_has_no_etag() {
        let fixture = ArchiveFixture::new("example.com");
        let record = html_record("http://example.com/", "index.html");
        fixture.write_record_file(&record, b"<html></html>");

        let response = response(render(&fixture, &AppConfig::default(), &[], &record, Some("anything")).await);
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.header(header::ETAG).is_none());
        assert_eq!(response.header(header::CONTENT_LENGTH), Some("13"));
    }

    #[tokio::test]
    async fn test_html_injection_and_length() {
        let fixture = ArchiveFixture::new("example.com");
        let record = html_record("http://example.com/", "index.html");
        fixture.write_record_file(&record, b"<html><head></head><body></body></html>");
        fixture.write_file("analytics.html", "<script>t('\u{e9}')</script>".as_bytes());
        fixture.write_file("footer.html", b"<p>$1 off</p>");

        let injections = vec![
            Injection::from_rule(InjectionRule::before("analytics.html", "</head>")).unwrap(),
            Injection::from_rule(InjectionRule::before("footer.html", "</body>")).unwrap(),
            Injection::from_rule(InjectionRule {
                position: InjectPosition::Replace,
                ..InjectionRule::before("footer.html", "<html>")
            })
            .unwrap(),
        ];

        let response = response(render(&fixture, &AppConfig::default(), &injections, &record, None).await);
        let expected = "<p>$1 off</p><head><script>t('\u{e9}')</script></head><body><p>$1 off</p></body></html>";
        assert_eq!(response.header(header::CONTENT_LENGTH), Some(expected.len().to_string().as_str()));
        assert_eq!(response.body.into_bytes().await.unwrap().as_ref(), expected.as_bytes());
    }

    #[tokio::test]
    async fn test_other_types_stream_without_length() {
        let fixture = ArchiveFixture::new("example.com");
        let record = asset_record("http://example.com/doc.pdf", "doc.pdf", "application/pdf");
        fixture.write_record_file(&record, b"%PDF-1.4");

        let response = response(render(&fixture, &AppConfig::default(), &[], &record, None).await);
        assert!(matches!(response.body, ReplayBody::File(_)));
        assert!(response.header(header::CONTENT_LENGTH).is_none());
        assert!(response.header(header::ETAG).is_none());
    }
}
