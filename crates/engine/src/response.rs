//! Response model handed back to the front end.

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use tokio::io::AsyncReadExt;

/// Body of a replayed response.
#[derive(Debug)]
pub enum ReplayBody {
    Empty,
    /// Fully buffered content (HTML after injection, XML sitemaps).
    Full(Bytes),
    /// Captured file to stream as-is.
    File(tokio::fs::File),
}

impl ReplayBody {
    pub fn is_empty(&self) -> bool {
        match self {
            ReplayBody::Empty => true,
            ReplayBody::Full(bytes) => bytes.is_empty(),
            ReplayBody::File(_) => false,
        }
    }

    /// Read the whole body into memory.
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        match self {
            ReplayBody::Empty => Ok(Bytes::new()),
            ReplayBody::Full(bytes) => Ok(bytes),
            ReplayBody::File(mut file) => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

/// A fully decided response.
#[derive(Debug)]
pub struct ReplayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ReplayBody,
}

impl ReplayResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: ReplayBody::Empty }
    }

    /// 301 to `location`.
    pub fn moved_permanently(location: &str) -> Self {
        Self::new(StatusCode::MOVED_PERMANENTLY).with_header(header::LOCATION, location)
    }

    /// Bare 404 with an empty body.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// Empty 200, e.g. a sitemap for a host with no pages.
    pub fn empty() -> Self {
        Self::new(StatusCode::OK)
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        self.headers.insert(name, header_value(value));
        self
    }

    pub fn with_body(mut self, body: ReplayBody) -> Self {
        self.body = body;
        self
    }

    /// Header value as a string, if present and readable.
    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Outcome of resolving a request.
#[derive(Debug)]
pub enum Resolution {
    /// The engine decided the response.
    Respond(ReplayResponse),
    /// The request belongs to the CMS mounted alongside the archive.
    Delegate,
}

impl Resolution {
    /// The decided response, if the engine kept the request.
    pub fn into_response(self) -> Option<ReplayResponse> {
        match self {
            Resolution::Respond(response) => Some(response),
            Resolution::Delegate => None,
        }
    }
}

impl From<ReplayResponse> for Resolution {
    fn from(response: ReplayResponse) -> Self {
        Resolution::Respond(response)
    }
}

/// Build a header value from archive data.
///
/// Control characters cannot appear in header values and are dropped; all other
/// bytes, including non-ASCII UTF-8, pass through.
pub fn header_value(text: &str) -> HeaderValue {
    let cleaned: String = text.chars().filter(|c| !c.is_control()).collect();
    HeaderValue::from_bytes(cleaned.as_bytes()).unwrap_or_else(|_| HeaderValue::from_static(""))
}
