//! Configuration module for schema-intel.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CacheSettings, CacheTtlSettings, DatabaseSettings, LoggingSettings,
    RankingSettings, Settings, SettingsError, CONFIG_ENV_VAR,
};
