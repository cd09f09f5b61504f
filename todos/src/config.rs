//! Configuration management for the task list.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::persistence::DEFAULT_STORAGE_KEY;
use crate::theme::DEFAULT_THEME_KEY;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tasklist_runtime::store::DEFAULT_BROADCAST_CAPACITY;
use thiserror::Error;

/// Default directory of the file-backed key-value store
pub const DEFAULT_DATA_DIR: &str = ".tasklist";

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "tasklist=info,tasklist_runtime=info";

/// Errors found while loading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("invalid value '{value}' for {variable}")]
    InvalidValue {
        /// Environment variable name
        variable: &'static str,
        /// Value as found
        value: String,
    },

    /// Todos and theme would be written to the same key
    #[error("storage key '{0}' is used for both todos and theme")]
    KeyCollision(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one file per stored key (`TASKLIST_DATA_DIR`)
    pub data_dir: PathBuf,
    /// Key of the todo collection (`TASKLIST_STORAGE_KEY`)
    pub storage_key: String,
    /// Key of the theme mode (`TASKLIST_THEME_KEY`)
    pub theme_key: String,
    /// `tracing` filter directives (`TASKLIST_LOG`)
    pub log_filter: String,
    /// Change-event channel capacity (`TASKLIST_BROADCAST_CAPACITY`)
    pub broadcast_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            theme_key: DEFAULT_THEME_KEY.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the todo and
    /// theme keys collide.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let broadcast_capacity = match lookup("TASKLIST_BROADCAST_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        variable: "TASKLIST_BROADCAST_CAPACITY",
                        value: raw,
                    });
                },
            },
            None => defaults.broadcast_capacity,
        };

        let config = Self {
            data_dir: lookup("TASKLIST_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            storage_key: non_empty(&lookup, "TASKLIST_STORAGE_KEY")?
                .unwrap_or(defaults.storage_key),
            theme_key: non_empty(&lookup, "TASKLIST_THEME_KEY")?.unwrap_or(defaults.theme_key),
            log_filter: lookup("TASKLIST_LOG").unwrap_or(defaults.log_filter),
            broadcast_capacity,
        };

        if config.storage_key == config.theme_key {
            return Err(ConfigError::KeyCollision(config.storage_key));
        }

        Ok(config)
    }
}

fn non_empty<F>(lookup: &F, variable: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(variable) {
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue { variable, value }),
        other => Ok(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage_key, "vue-todo-app");
        assert_eq!(config.theme_key, "themeMode");
        assert_eq!(config.broadcast_capacity, 16);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("TASKLIST_DATA_DIR", "/tmp/todos"),
            ("TASKLIST_STORAGE_KEY", "work"),
            ("TASKLIST_BROADCAST_CAPACITY", "64"),
            ("TASKLIST_LOG", "debug"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/todos"));
        assert_eq!(config.storage_key, "work");
        assert_eq!(config.broadcast_capacity, 64);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn rejects_bad_capacity() {
        for raw in ["zero", "0", "-1"] {
            assert_eq!(
                load(&[("TASKLIST_BROADCAST_CAPACITY", raw)]),
                Err(ConfigError::InvalidValue {
                    variable: "TASKLIST_BROADCAST_CAPACITY",
                    value: raw.to_string(),
                })
            );
        }
    }

    #[test]
    fn rejects_blank_keys() {
        assert!(matches!(
            load(&[("TASKLIST_STORAGE_KEY", "  ")]),
            Err(ConfigError::InvalidValue { variable: "TASKLIST_STORAGE_KEY", .. })
        ));
    }

    #[test]
    fn rejects_shared_key() {
        assert_eq!(
            load(&[("TASKLIST_THEME_KEY", "vue-todo-app")]),
            Err(ConfigError::KeyCollision("vue-todo-app".to_string()))
        );
    }
}
