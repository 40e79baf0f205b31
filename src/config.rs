//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `CHRONOSQL_*` environment variable
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query engine connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    #[serde(default = "default_controller_url")]
    pub controller_url: String,

    /// Bearer token sent to broker and controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Database header for multi-database deployments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_broker_url() -> String {
    "http://localhost:8099".to_string()
}

fn default_controller_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            controller_url: default_controller_url(),
            auth_token: None,
            database: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Query compilation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// LIMIT of builder queries that do not set one
    #[serde(default = "default_series_limit")]
    pub series_limit: u64,

    #[serde(default = "default_log_limit")]
    pub log_limit: u64,

    #[serde(default = "default_distinct_limit")]
    pub distinct_limit: u64,

    /// Bucket count target when neither granularity nor interval is given
    #[serde(default = "default_max_data_points")]
    pub max_data_points: u64,
}

fn default_series_limit() -> u64 {
    1_000_000
}

fn default_log_limit() -> u64 {
    1_000
}

fn default_distinct_limit() -> u64 {
    crate::sql::DEFAULT_DISTINCT_VALUES_LIMIT
}

fn default_max_data_points() -> u64 {
    1_000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            series_limit: default_series_limit(),
            log_limit: default_log_limit(),
            distinct_limit: default_distinct_limit(),
            max_data_points: default_max_data_points(),
        }
    }
}

/// Metadata cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("chronosql").join("config.toml")),
            Some(PathBuf::from("/etc/chronosql/config.toml")),
            Some(PathBuf::from("./chronosql.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `CHRONOSQL_*` overrides looked up through `var`
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Engine overrides
        if let Some(url) = var("CHRONOSQL_BROKER_URL") {
            self.engine.broker_url = url;
        }
        if let Some(url) = var("CHRONOSQL_CONTROLLER_URL") {
            self.engine.controller_url = url;
        }
        if let Some(token) = var("CHRONOSQL_AUTH_TOKEN") {
            self.engine.auth_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(database) = var("CHRONOSQL_DATABASE") {
            self.engine.database = Some(database).filter(|d| !d.is_empty());
        }
        if let Some(timeout) = var("CHRONOSQL_REQUEST_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.engine.request_timeout_ms = t;
            }
        }

        // Cache overrides
        if let Some(ttl) = var("CHRONOSQL_CACHE_TTL_SECS") {
            if let Ok(t) = ttl.parse() {
                self.cache.ttl_secs = t;
            }
        }

        // Logging overrides
        if let Some(level) = var("CHRONOSQL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("CHRONOSQL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# chronosql configuration
#
# Environment variables override these settings:
# - CHRONOSQL_BROKER_URL
# - CHRONOSQL_CONTROLLER_URL
# - CHRONOSQL_AUTH_TOKEN
# - CHRONOSQL_DATABASE
# - CHRONOSQL_REQUEST_TIMEOUT_MS
# - CHRONOSQL_CACHE_TTL_SECS
# - CHRONOSQL_LOG_LEVEL
# - CHRONOSQL_LOG_FORMAT

[engine]
# Broker endpoint receiving SQL
broker_url = "http://localhost:8099"

# Controller endpoint serving schemas and table configs
controller_url = "http://localhost:9000"

# Bearer token (optional)
# auth_token = ""

# Database name (optional)
# database = ""

# Request timeout (ms)
request_timeout_ms = 30000

[query]
# LIMIT of time-series queries that do not set one
series_limit = 1000000

# LIMIT of log queries that do not set one
log_limit = 1000

# LIMIT of distinct-value queries that do not set one
distinct_limit = 100

# Target bucket count when no granularity or interval is given
max_data_points = 1000

[cache]
# Cache schemas and table configs
enabled = true

# Time to live (seconds)
ttl_secs = 300

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_file_matches_defaults() {
        let parsed: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[engine]\nbroker_url = \"http://broker:8099\"\ndatabase = \"analytics\"\n\n[cache]\nttl_secs = 60"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.engine.broker_url, "http://broker:8099");
        assert_eq!(config.engine.database.as_deref(), Some("analytics"));
        assert_eq!(config.engine.controller_url, default_controller_url());
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.cache.enabled);
        assert_eq!(config.query, QueryConfig::default());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[engine\nbroker_url = 1").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CHRONOSQL_BROKER_URL", "http://b:1"),
            ("CHRONOSQL_AUTH_TOKEN", "secret"),
            ("CHRONOSQL_DATABASE", ""),
            ("CHRONOSQL_CACHE_TTL_SECS", "not-a-number"),
            ("CHRONOSQL_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.engine.database = Some("old".to_string());
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.engine.broker_url, "http://b:1");
        assert_eq!(config.engine.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.engine.database, None);
        assert_eq!(config.cache.ttl_secs, default_cache_ttl());
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_to_toml_round_trip() {
        let mut config = Config::default();
        config.engine.auth_token = Some("t".to_string());
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
