use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::{GenError, Result};
use crate::store::CacheStore;

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-process edge tier, lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|e| GenError::Other(format!("memory cache poisoned: {}", e)))
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now();
        Ok(self
            .entries()?
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        // Keys are whole request targets, so stale entries are dropped on
        // every write or the map grows for the life of the process.
        let mut entries = self.entries()?;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_and_expiry() {
        let store = MemoryStore::new();
        store.put("fresh", "a", Duration::from_secs(3600)).unwrap();
        store.put("stale", "b", Duration::ZERO).unwrap();

        assert_eq!(store.get("fresh").unwrap().as_deref(), Some("a"));
        assert!(store.get("stale").unwrap().is_none());
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryStore::new();
        store.put("fresh", "a", Duration::from_secs(3600)).unwrap();
        store.put("stale", "b", Duration::ZERO).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.get("fresh").unwrap().is_some());
    }

    #[test]
    fn test_put_evicts_expired_entries() {
        let store = MemoryStore::new();
        for i in 0..500 {
            store.put(&format!("/?sid={}", i), "x", Duration::ZERO).unwrap();
        }
        store.put("fresh", "a", Duration::from_secs(3600)).unwrap();

        assert_eq!(store.entries().unwrap().len(), 1);
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let store = MemoryStore::new();
        store.put("k", "v", Duration::MAX).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
