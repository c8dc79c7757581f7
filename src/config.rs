//! Sync configuration: defaults, an optional TOML file, then environment
//! overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;
use crate::types::SyncKey;

pub const ENV_ENABLED: &str = "NETPULSE_SYNC_ENABLED";
pub const ENV_LOCAL_STORE: &str = "NETPULSE_LOCAL_STORE";
pub const ENV_LOG_LEVEL: &str = "NETPULSE_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// When false, `start_sync()` reports unavailable without touching the
    /// remote store.
    pub enabled: bool,
    /// Keys the coordinator synchronizes.
    pub keys: Vec<SyncKey>,
    /// Path of the SQLite local store, if one is used.
    pub local_store_path: Option<PathBuf>,
    /// Capacity of the coordinator's command channel.
    pub mailbox_capacity: usize,
    pub logging: LoggingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keys: SyncKey::ALL.to_vec(),
            local_store_path: None,
            mailbox_capacity: 64,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Full,
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level.parse::<LevelFilter>().map_err(|e| ConfigError::Invalid {
            field: "logging.level".to_string(),
            reason: e.to_string(),
        })
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document. `origin` names the source in errors.
    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut config: SyncConfig =
            toml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }

    /// Load from `path`, then apply process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides using `lookup` as the environment. Invalid values are
    /// logged and ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_ENABLED) {
            match parse_bool(raw.trim()) {
                Some(enabled) => self.enabled = enabled,
                None => tracing::warn!("invalid {ENV_ENABLED}={raw:?}, ignoring"),
            }
        }

        if let Some(raw) = lookup(ENV_LOCAL_STORE) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                self.local_store_path = Some(PathBuf::from(trimmed));
            }
        }

        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            let trimmed = raw.trim();
            match trimmed.parse::<LevelFilter>() {
                Ok(_) => self.logging.level = trimmed.to_string(),
                Err(err) => tracing::warn!("invalid {ENV_LOG_LEVEL}, ignoring: {err}"),
            }
        }
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "mailbox_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.logging.level_filter()?;

        let mut seen = Vec::with_capacity(self.keys.len());
        self.keys.retain(|k| {
            if seen.contains(k) {
                false
            } else {
                seen.push(*k);
                true
            }
        });
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
