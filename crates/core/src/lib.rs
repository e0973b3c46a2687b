//! Core types and shared functionality for shenbury.
//!
//! This crate provides:
//! - Resource cache storage with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, ResourceStore, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
