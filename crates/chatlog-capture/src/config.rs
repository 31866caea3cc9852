use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chatlog_types::id::deserialize_id_set;
use serde::Deserialize;
use thiserror::Error;

use crate::filter::FilterPolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:///./chat_logs.db";
pub const DEFAULT_DATABASE_NAME: &str = "langbot_chat";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Capture settings, read once at startup.
///
/// Deserializes from the host's per-plugin config object; every key is
/// optional and falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub database_url: String,
    /// Informational label, only logged.
    pub database_name: String,
    pub include_bot_messages: bool,
    #[serde(deserialize_with = "deserialize_id_set")]
    pub group_whitelist: BTreeSet<String>,
    #[serde(deserialize_with = "deserialize_id_set")]
    pub group_blacklist: BTreeSet<String>,
    /// Upper bound on a single append. `None` or 0 waits indefinitely.
    pub write_timeout_ms: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            database_name: DEFAULT_DATABASE_NAME.into(),
            include_bot_messages: true,
            group_whitelist: BTreeSet::new(),
            group_blacklist: BTreeSet::new(),
            write_timeout_ms: None,
        }
    }
}

impl CaptureConfig {
    /// Reads `CHATLOG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads a JSON config document.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Builds a config from an arbitrary variable source. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CHATLOG_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(name) = lookup("CHATLOG_DATABASE_NAME") {
            config.database_name = name;
        }
        if let Some(raw) = lookup("CHATLOG_INCLUDE_BOT_MESSAGES") {
            config.include_bot_messages = parse_bool("CHATLOG_INCLUDE_BOT_MESSAGES", &raw)?;
        }
        if let Some(raw) = lookup("CHATLOG_GROUP_WHITELIST") {
            config.group_whitelist = parse_list(&raw);
        }
        if let Some(raw) = lookup("CHATLOG_GROUP_BLACKLIST") {
            config.group_blacklist = parse_list(&raw);
        }
        if let Some(raw) = lookup("CHATLOG_WRITE_TIMEOUT_MS") {
            let ms = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "CHATLOG_WRITE_TIMEOUT_MS",
                value: raw.clone(),
            })?;
            config.write_timeout_ms = Some(ms);
        }

        Ok(config)
    }

    pub fn policy(&self) -> FilterPolicy {
        FilterPolicy {
            whitelist: self.group_whitelist.clone(),
            blacklist: self.group_blacklist.clone(),
        }
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn parse_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
