//! Configuration loading.
//!
//! Values come from a TOML file or from `KOSELIG_*` environment variables.

use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Default table namespace of a fresh install.
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Largest minute count whose duration in seconds fits in a `u64`.
pub const MAX_CACHING_MINUTES: u64 = u64::MAX / 60;

/// Whether query results are remembered by the query layer, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachingPolicy {
    #[default]
    Disabled,
    /// Remember query results for the given number of minutes.
    Minutes(u64),
}

impl CachingPolicy {
    /// Duration to remember results for, or `None` when disabled.
    pub fn remember_for(&self) -> Option<Duration> {
        match self {
            CachingPolicy::Disabled => None,
            CachingPolicy::Minutes(minutes) => {
                Some(Duration::from_secs(minutes.saturating_mul(60)))
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, CachingPolicy::Minutes(_))
    }

    /// Parse the textual form used by environment variables.
    ///
    /// `""`, `"false"`, `"off"` and `"0"` disable caching, any positive
    /// integer is a number of minutes.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "" | "false" | "off" | "0" => Ok(CachingPolicy::Disabled),
            other => other
                .parse::<u64>()
                .map(CachingPolicy::Minutes)
                .map_err(|_| ConfigError::InvalidValue {
                    field: "caching",
                    reason: format!("expected minutes or false, got {raw:?}"),
                }),
        }
    }
}

impl<'de> Deserialize<'de> for CachingPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Minutes(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) | Raw::Minutes(0) => CachingPolicy::Disabled,
            Raw::Flag(true) => {
                return Err(serde::de::Error::custom(
                    "caching = true needs a duration in minutes",
                ))
            }
            Raw::Minutes(minutes) => CachingPolicy::Minutes(minutes),
        })
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KoseligConfig {
    /// Base table namespace, e.g. `wp_`.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Whether the install is a multisite network.
    #[serde(default)]
    pub multisite: bool,
    #[serde(default)]
    pub caching: CachingPolicy,
}

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

impl Default for KoseligConfig {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            multisite: false,
            caching: CachingPolicy::Disabled,
        }
    }
}

impl KoseligConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: KoseligConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from `KOSELIG_TABLE_PREFIX`, `KOSELIG_MULTISITE` and
    /// `KOSELIG_CACHING`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table_prefix = lookup("KOSELIG_TABLE_PREFIX").unwrap_or_else(default_table_prefix);
        let multisite = lookup("KOSELIG_MULTISITE")
            .map(|s| s == "true" || s == "1")
            .unwrap_or(false);
        let caching = match lookup("KOSELIG_CACHING") {
            Some(raw) => CachingPolicy::parse(&raw)?,
            None => CachingPolicy::Disabled,
        };

        let config = Self {
            table_prefix,
            multisite,
            caching,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "table_prefix",
                reason: "must not be empty".to_string(),
            });
        }
        if !self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidValue {
                field: "table_prefix",
                reason: "only ASCII letters, digits and '_' are allowed".to_string(),
            });
        }
        if let CachingPolicy::Minutes(minutes) = self.caching {
            if minutes > MAX_CACHING_MINUTES {
                return Err(ConfigError::InvalidValue {
                    field: "caching",
                    reason: format!("{minutes} minutes exceeds the maximum of {MAX_CACHING_MINUTES}"),
                });
            }
        }
        Ok(())
    }
}
