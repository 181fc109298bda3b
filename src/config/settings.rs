//! TOML-based configuration for schema-intel.
//!
//! Supports a config file (schema-intel.toml) with environment variable
//! expansion in the database path.
//!
//! Example configuration:
//! ```toml
//! [database]
//! path = "${DATA_DIR}/chinook.db"
//! name = "chinook"
//!
//! [cache]
//! max_size = 200
//! cleanup_interval_secs = 120
//!
//! [cache.ttl]
//! schema = 1800
//! join_paths = 600
//!
//! [ranking]
//! top_k = 8
//! max_tables = 10
//! include_relationships = true
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{CacheNamespace, DEFAULT_CLEANUP_INTERVAL, DEFAULT_MAX_SIZE};
use crate::ranking::{ContextOptions, DEFAULT_MAX_TABLES, DEFAULT_TOP_K};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SCHEMA_INTEL_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub ranking: RankingSettings,
    pub logging: LoggingSettings,
}

/// Which database to introspect.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to a SQLite file (supports ${ENV_VAR} expansion).
    pub path: Option<String>,

    /// Name reported in the schema and used to scope cache keys.
    pub name: Option<String>,
}

impl DatabaseSettings {
    /// The database path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

/// Cache sizing and expiry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of entries.
    pub max_size: usize,

    /// Minimum seconds between expiry sweeps.
    pub cleanup_interval_secs: u64,

    /// Per-namespace TTLs.
    pub ttl: CacheTtlSettings,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL.as_secs(),
            ttl: CacheTtlSettings::default(),
        }
    }
}

impl CacheSettings {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// TTL in seconds for each cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheTtlSettings {
    pub schema: u64,
    pub relationships: u64,
    pub tables: u64,
    pub statistics: u64,
    pub join_paths: u64,
    pub analysis: u64,
}

impl Default for CacheTtlSettings {
    fn default() -> Self {
        let secs = |ns: CacheNamespace| ns.default_ttl().as_secs();
        Self {
            schema: secs(CacheNamespace::Schema),
            relationships: secs(CacheNamespace::Relationships),
            tables: secs(CacheNamespace::Tables),
            statistics: secs(CacheNamespace::Statistics),
            join_paths: secs(CacheNamespace::JoinPaths),
            analysis: secs(CacheNamespace::Analysis),
        }
    }
}

impl CacheTtlSettings {
    /// TTL for entries of `namespace`.
    pub fn ttl(&self, namespace: CacheNamespace) -> Duration {
        let secs = match namespace {
            CacheNamespace::Schema | CacheNamespace::SchemaHash => self.schema,
            CacheNamespace::Relationships => self.relationships,
            CacheNamespace::Tables => self.tables,
            CacheNamespace::Statistics => self.statistics,
            CacheNamespace::JoinPaths => self.join_paths,
            CacheNamespace::Analysis => self.analysis,
        };
        Duration::from_secs(secs)
    }
}

/// Defaults for schema context assembly.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RankingSettings {
    pub top_k: usize,
    pub max_tables: usize,
    pub include_relationships: bool,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_tables: DEFAULT_MAX_TABLES,
            include_relationships: true,
        }
    }
}

impl RankingSettings {
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            top_k: self.top_k,
            max_tables: self.max_tables,
            include_relationships: self.include_relationships,
        }
    }
}

/// Logging output used by the CLI.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of error, warn, info, debug, trace.
    pub level: String,

    /// `text` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SCHEMA_INTEL_CONFIG`
    /// 2. `./schema-intel.toml`
    /// 3. `~/.config/schema-intel/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        // Check environment variable first
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        // Check local directory
        let local_config = PathBuf::from("schema-intel.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("schema-intel").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Reject values the cache and ranker cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.cache.max_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "cache.max_size must be at least 1".to_string(),
            ));
        }
        if self.ranking.top_k == 0 {
            return Err(SettingsError::InvalidConfig(
                "ranking.top_k must be at least 1".to_string(),
            ));
        }
        if self.ranking.max_tables < self.ranking.top_k {
            return Err(SettingsError::InvalidConfig(format!(
                "ranking.max_tables ({}) is smaller than ranking.top_k ({})",
                self.ranking.max_tables, self.ranking.top_k
            )));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next(); // consume '{'
        }

        let mut var_name = String::new();
        while let Some(&ch) = chars.peek() {
            if braced && ch == '}' {
                chars.next(); // consume '}'
                break;
            }
            if !braced && !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            var_name.push(ch);
            chars.next();
        }

        if var_name.is_empty() && !braced {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
