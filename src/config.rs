use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Named set of defaults from the `[profiles]` table.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub endpoint_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot resolve config path: set BR_CONFIG or HOME/XDG_CONFIG_HOME.")]
    NoConfigPath,

    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config file '{}' does not contain a [profiles] section.", path.display())]
    NoProfiles { path: PathBuf },

    #[error("Profile '{name}' not found in config file '{}'.", path.display())]
    ProfileNotFound { name: String, path: PathBuf },

    #[error("Invalid {var} '{value}': {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Loads one profile from the resolved config file.
pub fn load_profile(name: &str) -> Result<ProfileConfig, ConfigError> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;
    profiles
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::ProfileNotFound {
            name: name.to_string(),
            path,
        })
}

/// Parses the config file, and the named profile when given.
pub fn validate_config(profile: Option<&str>) -> Result<PathBuf, ConfigError> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;
    if let Some(name) = profile {
        if !profiles.contains_key(name) {
            return Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
                path,
            });
        }
    }
    Ok(path)
}

fn read_profiles(path: &Path) -> Result<HashMap<String, ProfileConfig>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.profiles.ok_or_else(|| ConfigError::NoProfiles {
        path: path.to_path_buf(),
    })
}

fn config_path() -> Result<PathBuf, ConfigError> {
    resolve_config_path(|key| env::var(key).ok())
}

fn resolve_config_path(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf, ConfigError> {
    let non_empty = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    if let Some(path) = non_empty("BR_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    if let Some(xdg) = non_empty("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg)
            .join("bedrock-samples")
            .join("config.toml"));
    }

    let home = non_empty("HOME").ok_or(ConfigError::NoConfigPath)?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("bedrock-samples")
        .join("config.toml"))
}
