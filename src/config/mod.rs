//! Configuration management for ptgen.
//!
//! Configuration is read from `~/.config/ptgen/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! A handful of secrets can also be supplied through the environment, which
//! takes precedence over the file.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub douban: DoubanConfig,
    pub indienova: IndienovaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for `ptgen serve`
    pub bind: String,
    /// Shared secret; when set, every request must carry a matching `apikey`
    pub apikey: Option<String>,
    /// Name shown in the copyright line and internal error messages
    pub maintainer: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            apikey: None,
            maintainer: "ptgen".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// SQLite file for the persistent tier (default: `<data_dir>/ptgen/cache.db`)
    pub path: Option<PathBuf>,
    /// Persistent tier lifetime in seconds (default: 2 days)
    pub ttl_secs: u64,
    /// Edge tier lifetime in seconds
    pub edge_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            ttl_secs: 86400 * 2,
            edge_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DoubanConfig {
    pub cookie: Option<String>,
    /// Key pool for the IMDb-to-Douban lookup API
    pub apikeys: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndienovaConfig {
    pub cookie: Option<String>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default().with_env());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config.with_env())
    }

    /// Get the default config file path: `~/.config/ptgen/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("ptgen").join("config.toml"))
    }

    /// Overlay `APIKEY`, `DOUBAN_COOKIE` and `INDIENOVA_COOKIE`.
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(apikey) = non_empty("APIKEY") {
            self.server.apikey = Some(apikey);
        }
        if let Some(cookie) = non_empty("DOUBAN_COOKIE") {
            self.douban.cookie = Some(cookie);
        }
        if let Some(cookie) = non_empty("INDIENOVA_COOKIE") {
            self.indienova.cookie = Some(cookie);
        }
        self
    }

    /// Resolve the persistent cache location.
    pub fn cache_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.cache.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("ptgen").join("cache.db"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# ptgen configuration
#
# APIKEY, DOUBAN_COOKIE and INDIENOVA_COOKIE in the environment override
# the matching values below.

[server]
# Listen address for `ptgen serve`
bind = "0.0.0.0:8080"

# Shared secret. When set, requests must pass `apikey=<value>`
# apikey = "change-me"

# Shown in the copyright line and in internal error messages
maintainer = "ptgen"

[cache]
enabled = true

# SQLite file for the persistent cache (default: <data dir>/ptgen/cache.db)
# path = "/var/lib/ptgen/cache.db"

# Persistent cache lifetime (2 days)
ttl_secs = 172800

# In-process request cache lifetime
edge_ttl_secs = 3600

[http]
timeout_secs = 10

[douban]
# cookie = "bid=..."

# Keys used to map IMDb ids onto Douban subjects
apikeys = []

[indienova]
# cookie = "..."
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
