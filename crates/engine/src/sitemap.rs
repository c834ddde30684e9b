//! XML sitemaps generated from the archive.
//!
//! Hosts with more pages than fit one sitemap get a `<sitemapindex>` pointing
//! at numbered pages (`?id=1`, `?id=2`, ...). Locations are built from the
//! host the client addressed, so a rehosted archive advertises its own URLs.

use std::fmt::Write as _;

use bytes::Bytes;
use http::{StatusCode, header};
use quick_xml::escape::escape;
use rehost_core::{ArchiveDb, Error};

use crate::request::ReplayRequest;
use crate::response::{ReplayBody, ReplayResponse};

/// Maximum URLs per sitemap page.
pub const PAGE_SIZE: u64 = 50_000;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Host whose pages a sitemap lists.
///
/// With a custom domain, the custom suffix of the requested host is swapped
/// for the original domain, so `shop.mirror.test` lists `shop.example.com`.
pub fn filter_domain(request: &ReplayRequest, custom_domain: Option<&str>, original_domain: &str) -> String {
    match custom_domain {
        Some(custom) => {
            let host = request.hostname();
            let prefix = host.strip_suffix(custom).unwrap_or(host);
            format!("{prefix}{original_domain}")
        }
        None => original_domain.to_string(),
    }
}

/// Requested sitemap page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRequest {
    /// No `id`: the index when paginated, else every page.
    All,
    Page(u64),
    Invalid,
}

fn parse_page(id: Option<&str>, pages: u64) -> PageRequest {
    let Some(id) = id.filter(|id| !id.is_empty()) else {
        return PageRequest::All;
    };
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return PageRequest::Invalid;
    }
    match id.parse::<u64>() {
        Ok(page) if (1..=pages).contains(&page) => PageRequest::Page(page),
        _ => PageRequest::Invalid,
    }
}

/// Sitemap producer for one archive.
pub struct SitemapGenerator<'a> {
    db: &'a ArchiveDb,
    sitemap_path: &'a str,
    page_size: u64,
}

impl<'a> SitemapGenerator<'a> {
    pub fn new(db: &'a ArchiveDb, sitemap_path: &'a str) -> Self {
        Self { db, sitemap_path, page_size: PAGE_SIZE }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Build the sitemap response for `request`, listing pages of `hostname`.
    pub async fn generate(&self, request: &ReplayRequest, hostname: &str) -> Result<ReplayResponse, Error> {
        let count = self.db.count_pages(hostname).await?;
        if count == 0 {
            tracing::debug!(hostname, "no pages for sitemap");
            return Ok(ReplayResponse::empty());
        }

        let pages = count.div_ceil(self.page_size);
        let id = request.query_param("id");
        let page = parse_page(id.as_deref(), pages);

        let base = format!("{}://{}", request.scheme, request.host);
        let document = match page {
            PageRequest::Invalid => {
                tracing::debug!(id = ?id, pages, "sitemap page out of range");
                return Ok(ReplayResponse::not_found());
            }
            PageRequest::All if pages > 1 => self.index(&base, pages),
            PageRequest::All => self.urlset(&base, self.db.list_pages(hostname, None).await?),
            PageRequest::Page(n) => {
                let window = (self.page_size, (n - 1) * self.page_size);
                self.urlset(&base, self.db.list_pages(hostname, Some(window)).await?)
            }
        };

        tracing::debug!(hostname, count, pages, "generated sitemap");
        Ok(ReplayResponse::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE, CONTENT_TYPE)
            .with_body(ReplayBody::Full(Bytes::from(document))))
    }

    fn index(&self, base: &str, pages: u64) -> String {
        let mut xml = format!(r#"{XML_DECLARATION}<sitemapindex xmlns="{SITEMAP_NS}">"#);
        for n in 1..=pages {
            let loc = format!("{base}{}?id={n}", self.sitemap_path);
            let _ = write!(xml, "<sitemap><loc>{}</loc></sitemap>", escape(loc.as_str()));
        }
        xml.push_str("</sitemapindex>");
        xml
    }

    fn urlset(&self, base: &str, request_uris: Vec<String>) -> String {
        let mut xml = format!(r#"{XML_DECLARATION}<urlset xmlns="{SITEMAP_NS}">"#);
        for uri in request_uris {
            let loc = format!("{base}{uri}");
            let _ = write!(xml, "<url><loc>{}</loc></url>", escape(loc.as_str()));
        }
        xml.push_str("</urlset>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Scheme;
    use rehost_core::archive::fixture::{ArchiveFixture, asset_record, html_record, redirect_record};

    async fn sitemap(fixture: &ArchiveFixture, uri: &str, page_size: u64) -> ReplayResponse {
        let db = ArchiveDb::open(&fixture.archive_root()).await.unwrap();
        let request = ReplayRequest::new(Scheme::Https, "mirror.test", uri);
        SitemapGenerator::new(&db, "/sitemap.xml")
            .with_page_size(page_size)
            .generate(&request, "example.com")
            .await
            .unwrap()
    }

    async fn body(response: ReplayResponse) -> String {
        String::from_utf8(response.body.into_bytes().await.unwrap().to_vec()).unwrap()
    }

    fn seeded(pages: usize) -> ArchiveFixture {
        let fixture = ArchiveFixture::new("example.com");
        fixture.insert_many((0..pages).map(|i| html_record(&format!("http://example.com/p{i:06}"), "p.html")));
        fixture
    }

    #[test]
    fn test_filter_domain() {
        let request = ReplayRequest::new(Scheme::Http, "shop.mirror.test:8080", "/sitemap.xml");
        assert_eq!(filter_domain(&request, Some("mirror.test"), "example.com"), "shop.example.com");
        assert_eq!(filter_domain(&request, None, "example.com"), "example.com");

        let bare = ReplayRequest::new(Scheme::Http, "mirror.test", "/sitemap.xml");
        assert_eq!(filter_domain(&bare, Some("mirror.test"), "example.com"), "example.com");
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None, 3), PageRequest::All);
        assert_eq!(parse_page(Some(""), 3), PageRequest::All);
        assert_eq!(parse_page(Some("2"), 3), PageRequest::Page(2));
        assert_eq!(parse_page(Some("0"), 3), PageRequest::Invalid);
        assert_eq!(parse_page(Some("4"), 3), PageRequest::Invalid);
        assert_eq!(parse_page(Some("-1"), 3), PageRequest::Invalid);
        assert_eq!(parse_page(Some("1a"), 3), PageRequest::Invalid);
        assert_eq!(parse_page(Some("99999999999999999999999"), 3), PageRequest::Invalid);
    }

    #[tokio::test]
    async fn test_empty_sitemap() {
        let fixture = ArchiveFixture::new("example.com");
        let response = sitemap(&fixture, "/sitemap.xml", PAGE_SIZE).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.is_empty());
        assert!(response.header(header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_single_page_urlset() {
        let fixture = ArchiveFixture::new("example.com");
        fixture
            .insert(&html_record("http://example.com/b?x=1&y=2", "b.html"))
            .insert(&html_record("http://example.com/a", "a.html"))
            .insert(&asset_record("http://example.com/s.css", "s.css", "text/css"))
            .insert(&redirect_record("http://example.com/old", "http://example.com/a"))
            .insert(&html_record("http://other.com/c", "c.html"));

        let response = sitemap(&fixture, "/sitemap.xml", PAGE_SIZE).await;
        assert_eq!(response.header(header::CONTENT_TYPE), Some("text/xml; charset=utf-8"));
        assert_eq!(
            body(response).await,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
                "<url><loc>https://mirror.test/a</loc></url>",
                "<url><loc>https://mirror.test/b?x=1&amp;y=2</loc></url>",
                "</urlset>",
            )
        );
    }

    #[tokio::test]
    async fn test_small_page_size_paginates() {
        let fixture = seeded(5);

        let index = body(sitemap(&fixture, "/sitemap.xml", 2).await).await;
        assert!(index.contains("<sitemapindex"));
        assert_eq!(index.matches("<sitemap>").count(), 3);
        assert!(index.contains("<loc>https://mirror.test/sitemap.xml?id=3</loc>"));

        let last = body(sitemap(&fixture, "/sitemap.xml?id=3", 2).await).await;
        assert_eq!(last.matches("<url>").count(), 1);
        assert!(last.contains("/p000004<"));
    }

    #[tokio::test]
    async fn test_large_archive_pagination() {
        let fixture = seeded(120_000);

        let index = sitemap(&fixture, "/sitemap.xml", PAGE_SIZE).await;
        assert_eq!(index.status, StatusCode::OK);
        let index = body(index).await;
        assert_eq!(index.matches("<sitemap>").count(), 3);

        let page = body(sitemap(&fixture, "/sitemap.xml?id=2", PAGE_SIZE).await).await;
        let locs: Vec<&str> = page
            .split("<loc>")
            .skip(1)
            .filter_map(|rest| rest.split_once("</loc>").map(|(loc, _)| loc))
            .collect();
        assert_eq!(locs.len(), 50_000);
        assert_eq!(locs[0], "https://mirror.test/p050000");
        assert_eq!(locs[49_999], "https://mirror.test/p099999");

        let out_of_range = sitemap(&fixture, "/sitemap.xml?id=4", PAGE_SIZE).await;
        assert_eq!(out_of_range.status, StatusCode::NOT_FOUND);
        assert!(out_of_range.body.is_empty());

        let zero = sitemap(&fixture, "/sitemap.xml?id=0", PAGE_SIZE).await;
        assert_eq!(zero.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_numeric_id() {
        let fixture = seeded(3);
        let response = sitemap(&fixture, "/sitemap.xml?id=abc", PAGE_SIZE).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_single_page_with_id() {
        let fixture = seeded(3);
        let page = body(sitemap(&fixture, "/sitemap.xml?id=1", PAGE_SIZE).await).await;
        assert_eq!(page.matches("<url>").count(), 3);
    }
}
