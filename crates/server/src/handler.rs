//! Catch-all replay handler.
//!
//! Every request, whatever its method or path, is translated into a
//! [`ReplayRequest`] and resolved by the engine. Requests the engine hands
//! back go to the CMS router.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use rehost_engine::{ReplayBody, ReplayRequest, ReplayResponse, Resolution, Scheme};
use tokio_util::io::ReaderStream;
use tower::ServiceExt;

use crate::AppState;
use crate::error::ServeError;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Resolve a request against the archive.
pub async fn replay(State(state): State<AppState>, request: Request) -> Result<Response, ServeError> {
    let replay_request = to_replay_request(&request, state.local_port)?;

    match state.replayer.resolve(&replay_request).await? {
        Resolution::Respond(response) => Ok(into_http(response)),
        Resolution::Delegate => {
            tracing::debug!(url = %replay_request.url(), "delegating to cms");
            let response = state.cms.clone().oneshot(request).await;
            Ok(response.unwrap_or_else(|never: Infallible| match never {}))
        }
    }
}

/// Build the engine's view of an HTTP request.
pub fn to_replay_request(request: &Request, local_port: Option<u16>) -> Result<ReplayRequest, ServeError> {
    let headers = request.headers();
    let host = header_str(headers, header::HOST.as_str())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|authority| authority.to_string()))
        .filter(|host| !host.is_empty())
        .ok_or(ServeError::BadRequest("missing host"))?;

    let scheme = Scheme::infer(false, header_str(headers, FORWARDED_PROTO), local_port);
    let request_uri = request
        .uri()
        .path_and_query()
        .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());

    let mut replay_request = ReplayRequest::new(scheme, host, request_uri);
    if let Some(validator) = header_str(headers, header::IF_NONE_MATCH.as_str()) {
        replay_request = replay_request.with_if_none_match(validator);
    }
    Ok(replay_request)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Convert an engine response, streaming file bodies.
pub fn into_http(response: ReplayResponse) -> Response {
    let body = match response.body {
        ReplayBody::Empty => Body::empty(),
        ReplayBody::Full(bytes) => Body::from(bytes),
        ReplayBody::File(file) => Body::from_stream(ReaderStream::new(file)),
    };
    (response.status, response.headers, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> axum::http::request::Builder {
        Request::builder().uri(uri)
    }

    #[test]
    fn test_host_header_and_uri() {
        let req = request("/a/b?c=1").header(header::HOST, "mirror.test:8080").body(Body::empty()).unwrap();
        let replay = to_replay_request(&req, Some(8080)).unwrap();
        assert_eq!(replay.scheme, Scheme::Http);
        assert_eq!(replay.host, "mirror.test:8080");
        assert_eq!(replay.request_uri, "/a/b?c=1");
        assert!(replay.if_none_match.is_none());
    }

    #[test]
    fn test_authority_when_no_host_header() {
        let req = request("http://example.com/x").body(Body::empty()).unwrap();
        let replay = to_replay_request(&req, None).unwrap();
        assert_eq!(replay.host, "example.com");
        assert_eq!(replay.request_uri, "/x");
    }

    #[test]
    fn test_missing_host_rejected() {
        let req = request("/x").body(Body::empty()).unwrap();
        assert!(matches!(to_replay_request(&req, None), Err(ServeError::BadRequest(_))));
    }

    #[test]
    fn test_scheme_and_validator() {
        let req = request("/")
            .header(header::HOST, "example.com")
            .header(FORWARDED_PROTO, "https")
            .header(header::IF_NONE_MATCH, "\"abc\"")
            .body(Body::empty())
            .unwrap();
        let replay = to_replay_request(&req, Some(8080)).unwrap();
        assert_eq!(replay.scheme, Scheme::Https);
        assert_eq!(replay.if_none_match.as_deref(), Some("\"abc\""));

        let local_tls = request("/").header(header::HOST, "example.com").body(Body::empty()).unwrap();
        assert_eq!(to_replay_request(&local_tls, Some(443)).unwrap().scheme, Scheme::Https);
    }
}
