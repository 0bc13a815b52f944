use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::{GenError, Result};
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::sources::Registry;
use crate::store::{CacheStore, MemoryStore, SqliteStore};

pub struct AppContext {
    pub config: Config,
    pub registry: Registry,
    /// Semantic-key tier, holds successful envelopes only
    pub persistent: Option<Arc<dyn CacheStore>>,
    /// Request-keyed tier
    pub edge: Option<Arc<dyn CacheStore>>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.http)?);

        let persistent: Option<Arc<dyn CacheStore>> = if config.cache.enabled {
            let path = config
                .cache_path()
                .map_err(|e| GenError::Config(e.to_string()))?;
            Some(Arc::new(Self::open_store(&path)?))
        } else {
            None
        };

        Ok(Self::with_parts(config, fetcher, persistent))
    }

    /// Wire everything around an existing fetcher, with an in-memory
    /// database standing in for the persistent tier.
    pub fn in_memory(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let persistent: Option<Arc<dyn CacheStore>> = if config.cache.enabled {
            Some(Arc::new(SqliteStore::in_memory()?))
        } else {
            None
        };
        Ok(Self::with_parts(config, fetcher, persistent))
    }

    pub fn with_parts(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        persistent: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        let registry = Registry::new(fetcher, &config);
        let edge: Option<Arc<dyn CacheStore>> = if config.cache.enabled {
            Some(Arc::new(MemoryStore::new()))
        } else {
            None
        };

        Self {
            config,
            registry,
            persistent,
            edge,
        }
    }

    pub fn persistent_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.ttl_secs)
    }

    pub fn edge_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.edge_ttl_secs)
    }

    fn open_store(path: &Path) -> Result<SqliteStore> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::info!("Opening cache at {}", path.display());
        SqliteStore::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::StubFetcher;

    #[test]
    fn test_cache_disabled_has_no_tiers() {
        let mut config = Config::default();
        config.cache.enabled = false;

        let ctx = AppContext::in_memory(config, Arc::new(StubFetcher::new())).unwrap();
        assert!(ctx.persistent.is_none());
        assert!(ctx.edge.is_none());
    }

    #[test]
    fn test_new_creates_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");
        let mut config = Config::default();
        config.cache.path = Some(path.clone());

        let ctx = AppContext::new(config).unwrap();
        assert!(ctx.persistent.is_some());
        assert!(path.exists());
        assert_eq!(ctx.persistent_ttl(), Duration::from_secs(172_800));
    }
}
