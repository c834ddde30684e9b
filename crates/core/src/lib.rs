//! Core types and shared functionality for rehost.
//!
//! This crate provides:
//! - Read access to archived websites (SQLite index + captured files)
//! - Unified error types
//! - Configuration structures

pub mod archive;
pub mod config;
pub mod error;

pub use archive::{ArchiveDb, ArchiveRecord, ArchiveRoot, ArchiveSettings, WwwPolicy};
pub use config::{AppConfig, CmsMode, ConfigError, InjectPosition, InjectionRule};
pub use error::Error;
