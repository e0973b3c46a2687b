//! SQLite-backed resource cache storage.
//!
//! Persists named cache stores, one per cache generation, each holding
//! request-keyed response snapshots. It supports:
//!
//! - Request identity keys (method + absolute URL, SHA-256)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-store deletion when a generation is superseded

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use stores::StoredResponse;

/// Storage seam used by the resource cache controller.
///
/// `CacheDb` is the production implementation. Every method may fail when the
/// backing storage is unavailable; callers treat that as a degraded mode.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Create the named store if it does not exist yet.
    async fn open_store(&self, name: &str) -> Result<(), Error>;

    /// Names of every existing store, oldest first.
    async fn store_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and all its entries. Returns false if it did not exist.
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;

    /// Look up the snapshot stored for `method` + `url` in the named store.
    async fn match_entry(&self, store: &str, method: &str, url: &str) -> Result<Option<StoredResponse>, Error>;

    /// Insert or replace a snapshot in an existing store.
    async fn put_entry(&self, store: &str, entry: &StoredResponse) -> Result<(), Error>;

    /// Number of entries held by the named store.
    async fn entry_count(&self, store: &str) -> Result<u64, Error>;
}
