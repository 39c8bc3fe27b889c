//! Persistent settings for the curator CLI
//!
//! Settings live in a TOML file. The location is resolved in this order:
//! - `CURATOR_CONFIG` environment variable (tests / isolated runs)
//! - a pointer file `.curator_config_path` next to the default location
//! - `~/.config/curator/curator.toml`

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "CURATOR_CONFIG";
pub const POINTER_FILE_NAME: &str = ".curator_config_path";
const CONFIG_FILE_NAME: &str = "curator.toml";

/// Keys accepted by `get`/`set`
pub const KNOWN_KEYS: &[&str] = &[
    "default-expander",
    "prefix",
    "no-defaults-in-output",
    "ignore-inaccessible",
    "include-branches",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Unknown config key: {key}. Currently supported keys: {}", KNOWN_KEYS.join(", "))]
    UnknownKey { key: String },

    #[error("Invalid value '{value}' for '{key}': expected true or false")]
    InvalidBool { key: String, value: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Expander used when the command line does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_expander: Option<String>,
    /// Prefix label selected when checking manifests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_defaults_in_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_inaccessible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_branches: Option<bool>,
}

impl Config {
    /// Resolve the config file path
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        let default = Self::default_path()?;

        if let Some(pointer) = Self::pointer_path(&default) {
            if let Ok(contents) = fs::read_to_string(&pointer) {
                let trimmed = contents.trim();
                if !trimmed.is_empty() {
                    return Ok(PathBuf::from(trimmed));
                }
            }
        }

        Ok(default)
    }

    /// Platform default location of the config file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        #[cfg(not(target_os = "windows"))]
        let dir = dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".config");

        #[cfg(target_os = "windows")]
        let dir = dirs::config_dir().ok_or(ConfigError::NoHomeDir)?;

        Ok(dir.join("curator").join(CONFIG_FILE_NAME))
    }

    /// Pointer file sitting next to the given config file
    pub fn pointer_path(config_path: &Path) -> Option<PathBuf> {
        config_path.parent().map(|p| p.join(POINTER_FILE_NAME))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path; a missing file yields the default config
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "default-expander" => self.default_expander.clone(),
            "prefix" => self.prefix.clone(),
            "no-defaults-in-output" => self.no_defaults_in_output.map(|v| v.to_string()),
            "ignore-inaccessible" => self.ignore_inaccessible.map(|v| v.to_string()),
            "include-branches" => self.include_branches.map(|v| v.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "default-expander" => self.default_expander = Some(value),
            "prefix" => self.prefix = Some(value),
            "no-defaults-in-output" => self.no_defaults_in_output = Some(parse_bool(key, &value)?),
            "ignore-inaccessible" => self.ignore_inaccessible = Some(parse_bool(key, &value)?),
            "include-branches" => self.include_branches = Some(parse_bool(key, &value)?),
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values_iter().is_empty()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KNOWN_KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
