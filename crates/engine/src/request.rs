//! Inbound request model.
//!
//! The engine consumes only what a front end can cheaply hand over: the
//! scheme, the `Host` header, the raw request URI and the conditional-request
//! validator. Everything else about the HTTP exchange stays with the caller.

use std::fmt;

use rehost_core::ArchiveRoot;

/// Error type for building a request from an absolute URL.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Transport scheme of the inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Infer the scheme from what the front end knows about the connection.
    ///
    /// HTTPS when the connection is TLS, a proxy forwarded `https`, or the
    /// request arrived on port 443.
    pub fn infer(tls: bool, forwarded_proto: Option<&str>, local_port: Option<u16>) -> Self {
        let forwarded_https = forwarded_proto.is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));
        if tls || forwarded_https || local_port == Some(443) { Scheme::Https } else { Scheme::Http }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRequest {
    pub scheme: Scheme,
    /// Value of the `Host` header, port included if the client sent one.
    pub host: String,
    /// Path and query exactly as received, e.g. `/a/b?c=1`.
    pub request_uri: String,
    /// Value of `If-None-Match`, if any.
    pub if_none_match: Option<String>,
}

impl ReplayRequest {
    pub fn new(scheme: Scheme, host: impl Into<String>, request_uri: impl Into<String>) -> Self {
        let request_uri = request_uri.into();
        let request_uri = if request_uri.is_empty() { "/".to_string() } else { request_uri };
        Self { scheme, host: host.into(), request_uri, if_none_match: None }
    }

    pub fn with_if_none_match(mut self, validator: impl Into<String>) -> Self {
        self.if_none_match = Some(validator.into());
        self
    }

    /// Build a request from an absolute URL, as an operator would type it.
    ///
    /// Steps:
    /// 1. Trim leading/trailing whitespace
    /// 2. Default scheme to http:// if missing
    /// 3. Lowercase the host, keep any explicit port
    /// 4. Keep path and query untouched; drop the fragment
    pub fn from_url(input: &str) -> Result<Self, UrlError> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(UrlError::Empty);
        }

        let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };

        let parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

        let scheme = match parsed.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| UrlError::InvalidUrl("missing host".into()))?
            .to_lowercase();
        let host = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        };

        // Take path and query from the raw input so percent-encoding and
        // trailing `?` survive exactly as typed.
        let after_authority = url_str
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or_default();
        let request_uri = match after_authority.find(['/', '?']) {
            Some(index) => after_authority[index..].split('#').next().unwrap_or_default().to_string(),
            None => "/".to_string(),
        };

        Ok(Self::new(scheme, host, request_uri))
    }

    /// Path part of the request URI.
    pub fn path(&self) -> &str {
        self.request_uri.split(['?', '#']).next().unwrap_or_default()
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.request_uri.split_once('?')?.1;
        let query = query.split('#').next().unwrap_or_default();
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Host without a port suffix.
    pub fn hostname(&self) -> &str {
        match self.host.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
            _ => &self.host,
        }
    }

    /// The absolute URL as the client addressed it.
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.request_uri)
    }
}

/// State carried through the stages that run after an archive lookup.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub request: &'a ReplayRequest,
    pub archive_root: &'a ArchiveRoot,
    /// The request URL rewritten onto the original domain.
    pub original_url: &'a str,
}

impl<'a> RequestContext<'a> {
    pub fn new(request: &'a ReplayRequest, archive_root: &'a ArchiveRoot, original_url: &'a str) -> Self {
        Self { request, archive_root, original_url }
    }

    pub fn if_none_match(&self) -> Option<&'a str> {
        self.request.if_none_match.as_deref()
    }
}
