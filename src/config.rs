//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/wxcache/wxcache.toml`
//! 3. Explicit config file passed to [`Settings::load`]
//! 4. Environment variables: `WXCACHE_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::cache::CacheConfig;
use crate::application::{CacheError, CacheResult};
use crate::domain::KeyNormalization;

/// Weather API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the OpenWeatherMap data API
    pub base_url: String,
    /// API key (`appid`); required for the HTTP fetcher
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".into(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// Raw API config for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawApiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub staleness_secs: Option<u64>,
    pub key_normalization: Option<KeyNormalization>,
    pub bootstrap_city: Option<String>,
    pub city_list: Option<PathBuf>,
    pub api: RawApiConfig,
}

impl ApiConfig {
    fn merge(&self, overlay: &RawApiConfig) -> Self {
        Self {
            base_url: overlay
                .base_url
                .clone()
                .unwrap_or_else(|| self.base_url.clone()),
            api_key: overlay.api_key.clone().or_else(|| self.api_key.clone()),
            timeout_secs: overlay.timeout_secs.unwrap_or(self.timeout_secs),
        }
    }
}

/// Unified configuration for wxcache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Age in seconds at which an entry is refreshed (default: 1 hour)
    pub staleness_secs: u64,
    /// How city names are folded into keys
    pub key_normalization: KeyNormalization,
    /// City seeded into a new cache, if any
    pub bootstrap_city: Option<String>,
    /// JSON city list used for prefix search
    pub city_list: Option<PathBuf>,
    /// Weather API settings
    pub api: ApiConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            staleness_secs: 3600,
            key_normalization: KeyNormalization::default(),
            bootstrap_city: Some("Madison".into()),
            city_list: None,
            api: ApiConfig::default(),
        }
    }
}

/// Get the XDG config directory for wxcache.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wxcache").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("wxcache.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> CacheResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| CacheError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| CacheError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(path) = &self.city_list {
            let raw = path.to_string_lossy().into_owned();
            let expanded = shellexpand::full(&raw)
                .map(|s| s.into_owned())
                .unwrap_or(raw);
            self.city_list = Some(PathBuf::from(expanded));
        }
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            staleness_secs: overlay.staleness_secs.unwrap_or(self.staleness_secs),
            key_normalization: overlay
                .key_normalization
                .unwrap_or(self.key_normalization),
            bootstrap_city: overlay
                .bootstrap_city
                .clone()
                .or_else(|| self.bootstrap_city.clone()),
            city_list: overlay
                .city_list
                .clone()
                .or_else(|| self.city_list.clone()),
            api: self.api.merge(&overlay.api),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit TOML file, applied over the global config
    pub fn load(config_file: Option<&Path>) -> CacheResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("loading global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = config_file {
            debug!("loading config {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        current = Self::apply_env_overrides(
            current,
            Environment::with_prefix("WXCACHE")
                .prefix_separator("_")
                .separator("__"),
        )?;

        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Apply WXCACHE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self, env: Environment) -> CacheResult<Self> {
        let config = Config::builder()
            .add_source(env)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("staleness_secs") {
            settings.staleness_secs = val.parse().map_err(|e| CacheError::Config {
                message: format!("WXCACHE_STALENESS_SECS: {e}"),
            })?;
        }
        if let Ok(val) = config.get_string("key_normalization") {
            settings.key_normalization = val
                .parse()
                .map_err(|message| CacheError::Config { message })?;
        }
        if let Ok(val) = config.get_string("bootstrap_city") {
            settings.bootstrap_city = Some(val).filter(|c| !c.trim().is_empty());
        }
        if let Ok(val) = config.get_string("city_list") {
            settings.city_list = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("api.base_url") {
            settings.api.base_url = val;
        }
        if let Ok(val) = config.get_string("api.api_key") {
            settings.api.api_key = Some(val);
        }
        if let Ok(val) = config.get_string("api.timeout_secs") {
            settings.api.timeout_secs = val.parse().map_err(|e| CacheError::Config {
                message: format!("WXCACHE_API__TIMEOUT_SECS: {e}"),
            })?;
        }

        Ok(settings)
    }

    fn validate(&self) -> CacheResult<()> {
        if self.staleness_secs == 0 {
            return Err(CacheError::Config {
                message: "staleness_secs must be greater than zero".into(),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(CacheError::Config {
                message: "api.timeout_secs must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Cache policy derived from these settings.
    pub fn cache_config(&self) -> CacheConfig {
        let secs = i64::try_from(self.staleness_secs).unwrap_or(i64::MAX);
        CacheConfig::new()
            .with_staleness(TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX))
            .with_normalization(self.key_normalization)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> CacheResult<String> {
        toml::to_string_pretty(self).map_err(|e| CacheError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# wxcache configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/wxcache/wxcache.toml
#   File:   path passed to Settings::load
#   Env:    WXCACHE_* environment variables (WXCACHE_API__API_KEY for [api] api_key)

# Seconds after which a cached record is refreshed on access
# staleness_secs = 3600

# Key folding for city names: "lowercase" or "ascii-lowercase"
# key_normalization = "lowercase"

# City fetched when a cache is created
# bootstrap_city = "Madison"

# JSON list of {"name", "country"} objects for prefix search
# city_list = "~/.local/share/wxcache/city.list.json"

[api]
# base_url = "https://api.openweathermap.org/data/2.5"
# api_key = "..."
# timeout_secs = 10
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> CacheError {
    CacheError::Config {
        message: e.to_string(),
    }
}
