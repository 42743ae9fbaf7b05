//! Configuration for the txtv client.
//!
//! Loaded from TOML. The path is resolved in order: explicit path passed by
//! the caller, the `TXTV_CONFIG` environment variable, then
//! `~/.txtv/config.toml`. A missing file yields defaults; a malformed one is
//! an error. All engine durations live here so the cache policy and refresh
//! timing are injected rather than baked in.
//!
//! ## Example
//!
//! ```toml
//! base_url = "https://external.api.example.net"
//! app_id = "my-app"
//! app_key = "secret"
//! start_page = 100
//! cache_expires_secs = 600
//! cache_refresh_after_secs = 60
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;
use crate::error::{Error, Result};

/// Directory name under the user's home for config and data files.
const DOT_DIR: &str = ".txtv";

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the teletext service.
    pub base_url: String,
    /// Application id for the service API.
    pub app_id: String,
    /// Application key for the service API.
    pub app_key: String,
    /// Page shown on startup.
    pub start_page: u16,
    /// Seconds after which a cached page is evicted.
    pub cache_expires_secs: u64,
    /// Seconds after which a cached page is still served but refreshed in
    /// the background.
    pub cache_refresh_after_secs: u64,
    /// Seconds to wait before the background refresh of a stale page; rapid
    /// paging past stale entries restarts this delay.
    pub auto_refresh_delay_secs: u64,
    /// Seconds of inactivity after which the front-end reloads the current
    /// page.
    pub auto_refresh_interval_secs: u64,
    /// Whether navigation statistics are recorded.
    pub stats_enabled: bool,
    /// Override path for the statistics file.
    pub stats_path: Option<PathBuf>,
    /// Override path for the favorites file.
    pub favorites_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://external.api.yle.fi".to_string(),
            app_id: String::new(),
            app_key: String::new(),
            start_page: 100,
            cache_expires_secs: 600,
            cache_refresh_after_secs: 60,
            auto_refresh_delay_secs: 2,
            auto_refresh_interval_secs: 60,
            stats_enabled: true,
            stats_path: None,
            favorites_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Honors the `TXTV_CONFIG` environment variable; otherwise reads
    /// `~/.txtv/config.toml`. Returns defaults when no file exists.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("TXTV_CONFIG") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Self::load_from(Path::new(trimmed));
            }
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Default config file path (`~/.txtv/config.toml`), when a home
    /// directory can be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().join(DOT_DIR).join("config.toml"))
    }

    /// Directory for data files (statistics, favorites).
    #[must_use]
    pub fn data_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().join(DOT_DIR))
    }

    /// Cache expiry thresholds.
    #[must_use]
    pub const fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            expires: Duration::from_secs(self.cache_expires_secs),
            refresh_after: Duration::from_secs(self.cache_refresh_after_secs),
        }
    }

    /// Delay before a stale page's background refresh.
    #[must_use]
    pub const fn auto_refresh_delay(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_delay_secs)
    }

    /// Idle interval for the front-end's automatic reload.
    #[must_use]
    pub const fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_interval_secs)
    }

    /// Path of the statistics file, honoring the override.
    #[must_use]
    pub fn stats_path(&self) -> Option<PathBuf> {
        self.stats_path
            .clone()
            .or_else(|| Self::data_dir().map(|dir| dir.join("history.json")))
    }

    /// Path of the favorites file, honoring the override.
    #[must_use]
    pub fn favorites_path(&self) -> Option<PathBuf> {
        self.favorites_path
            .clone()
            .or_else(|| Self::data_dir().map(|dir| dir.join("favorites")))
    }
}
