//! Replay engine for rehost.
//!
//! This crate turns an inbound request into a response decision against an
//! archive on disk: canonical redirects, sitemaps, archived content with HTML
//! injection, and the fallback policy for misses. HTTP plumbing is left to the
//! front end; see `rehost-server`.

pub mod fallback;
pub mod normalize;
pub mod render;
pub mod request;
pub mod resolver;
pub mod response;
pub mod sitemap;

pub use normalize::{NormalizedUrl, alternate_form, normalize};
pub use render::{CallbackSource, ContentRenderer, ContentSource, FileSource, Injection, InjectionContext, Rendered};
pub use request::{ReplayRequest, RequestContext, Scheme, UrlError};
pub use resolver::Replayer;
pub use response::{ReplayBody, ReplayResponse, Resolution};
pub use sitemap::SitemapGenerator;
