//! Read access to an archived website.
//!
//! An archive is a `.content.<id>` directory produced by the ingestion tool. It
//! holds a SQLite store describing every captured URL plus the captured bodies
//! themselves. This module provides:
//!
//! - Archive root discovery and store file selection
//! - Case-insensitive URL lookup with most-recent-capture selection
//! - Typed access to the archive settings table
//! - Sitemap page queries
//! - Best-effort logging of unresolved URLs
//!
//! The store is opened once per request and dropped with it; nothing read
//! here is cached across requests.

pub mod connection;
pub mod hash;
pub mod missing;
pub mod pages;
pub mod records;
pub mod root;
pub mod schema;
pub mod settings;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use crate::Error;

pub use connection::ArchiveDb;
pub use records::ArchiveRecord;
pub use root::ArchiveRoot;
pub use settings::{ArchiveSettings, WwwPolicy};
