pub mod memory;
pub mod sqlite;

use std::time::Duration;

use crate::app::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// String key/value store with per-entry expiry.
pub trait CacheStore: Send + Sync {
    /// Live value for `key`; expired entries read as absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace `key`, live for `ttl` from now.
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Drop expired entries, returning how many went.
    fn purge_expired(&self) -> Result<usize>;
}
