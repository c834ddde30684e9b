//! HTTP front end for the rehost replay engine.
//!
//! # Architecture
//!
//! - **AppState**: the shared [`Replayer`], the CMS router misses can be
//!   handed to, and the port the listener is bound to
//! - **handler**: one catch-all route translating HTTP to engine requests
//! - **error**: 503 mapping for archive failures

mod error;
pub mod handler;

use std::sync::Arc;

use axum::Router;
use rehost_engine::Replayer;

pub use self::error::{ERROR_DESCRIPTION, ServeError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub replayer: Arc<Replayer>,
    /// Receives requests the engine delegates. Answers 404 unless replaced.
    pub cms: Router,
    /// Local port of the listener, used to detect HTTPS on 443.
    pub local_port: Option<u16>,
}

impl AppState {
    pub fn new(replayer: Replayer) -> Self {
        Self { replayer: Arc::new(replayer), cms: Router::new(), local_port: None }
    }

    /// Mount a CMS to receive delegated requests.
    pub fn with_cms(mut self, cms: Router) -> Self {
        self.cms = cms;
        self
    }

    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = Some(port);
        self
    }
}

/// Build the router: every method and path goes to the replay handler.
pub fn router(state: AppState) -> Router {
    Router::new().fallback(handler::replay).with_state(state)
}
