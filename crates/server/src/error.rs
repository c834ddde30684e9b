//! Structured errors for the rehost front end.
//!
//! Archive failures become 503 with an `X-Error-Description` header naming
//! the problem; the full error only goes to the log.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const ERROR_DESCRIPTION: HeaderName = HeaderName::from_static("x-error-description");

/// Errors raised while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The request did not name a host.
    #[error("BAD_REQUEST: {0}")]
    BadRequest(&'static str),

    /// The archive could not be used for this request.
    #[error(transparent)]
    Archive(#[from] rehost_core::Error),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        match &self {
            ServeError::BadRequest(reason) => {
                tracing::debug!(reason, "rejecting request");
                StatusCode::BAD_REQUEST.into_response()
            }
            ServeError::Archive(err) => {
                tracing::error!(error = %err, "archive unavailable");
                let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
                response
                    .headers_mut()
                    .insert(ERROR_DESCRIPTION, HeaderValue::from_static(err.description()));
                response
            }
        }
    }
}
