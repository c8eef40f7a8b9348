use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_USER_AGENT: &str = concat!("purgekit/", env!("CARGO_PKG_VERSION"));

/// Default location of the edge page cache
pub const DEFAULT_EDGE_CACHE_DIR: &str = "/var/run/nginx-cache";

/// Default location of the object cache integration drop-in
pub const DEFAULT_OBJECT_DROP_IN: &str = "/var/www/html/wp-content/object-cache.php";

/// Default base URL of the CDN management API
pub const DEFAULT_CDN_API_BASE: &str = "https://api.cloudflare.com/client/v4/";

/// Top level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {
    pub edge: EdgeConfig,
    pub object: ObjectCacheConfig,
    pub cdn: CdnConfig,
    pub timeouts: TimeoutConfig,
    pub result_store: ResultStoreConfig,
}

/// How the edge cache keeps its pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeCacheMode {
    /// Page cache files on the local filesystem
    #[default]
    Disk,
    /// Pages kept in a Redis-protocol store
    Store,
    /// Edge caching is not in use
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub mode: EdgeCacheMode,
    /// Directory holding cached pages; also the target of the file-removal fallback
    pub cache_dir: PathBuf,
    /// Connection parameters for `store` mode
    pub store: StoreConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            mode: EdgeCacheMode::Disk,
            cache_dir: PathBuf::from(DEFAULT_EDGE_CACHE_DIR),
            store: StoreConfig::default(),
        }
    }
}

/// Connection parameters for a Redis-protocol store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// e.g. `redis://127.0.0.1:6379/0`; empty means "not configured"
    pub url: String,
    /// Only keys starting with this prefix are purged; empty flushes the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl StoreConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Prefix to purge, ignoring blank values
    pub fn effective_prefix(&self) -> Option<&str> {
        self.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectCacheConfig {
    /// Store URL; empty means "not configured"
    pub url: String,
    /// Integration drop-in that routes the application's object cache to the store
    pub drop_in: PathBuf,
}

impl Default for ObjectCacheConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            drop_in: PathBuf::from(DEFAULT_OBJECT_DROP_IN),
        }
    }
}

impl ObjectCacheConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Drop-in path, ignoring a blank value
    pub fn drop_in_path(&self) -> Option<&Path> {
        Some(self.drop_in.as_path()).filter(|p| !p.as_os_str().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    /// Account identifier (the account e-mail for key-based auth)
    pub email: String,
    pub api_key: String,
    pub zone_id: String,
    /// Whether the platform-optimization layer is switched on locally
    pub platform_optimization: bool,
    pub api_base: String,
    pub user_agent: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            api_key: String::new(),
            zone_id: String::new(),
            platform_optimization: false,
            api_base: DEFAULT_CDN_API_BASE.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on live probes made while computing status
    pub probe_secs: u64,
    /// Bound on each backend's network call during a purge
    pub purge_secs: u64,
    /// Guard applied by the orchestrator around a whole adapter purge
    pub adapter_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 2,
            purge_secs: 10,
            adapter_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs.max(1))
    }

    pub fn purge(&self) -> Duration {
        Duration::from_secs(self.purge_secs.max(1))
    }

    pub fn adapter(&self) -> Duration {
        Duration::from_secs(self.adapter_secs.max(1))
    }
}

/// Where the last purge report is kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultStoreConfig {
    /// JSON file holding the last report; in-memory only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}
