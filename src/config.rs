use std::fs;
use std::path::{Path, PathBuf};

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::{TimeRange, DEFAULT_PAGE_SIZE};
use crate::navigation::SessionState;

const APP_NAME: &str = "simscope";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Data set loaded when no `--data` flag is given
    pub dataset_path: Option<PathBuf>,
    /// Files per page in folder listings
    pub page_size: usize,
    /// Time range the session starts with
    pub time_range: TimeRange,
    /// Where view preferences are persisted. In-memory only when unset.
    pub preferences_path: Option<PathBuf>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            time_range: TimeRange::All,
            preferences_path: None,
        }
    }
}

impl ExplorerConfig {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides.
    /// Falls back to defaults if the file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let config = match default_config_path().and_then(|path| Self::try_load(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        };
        config.with_env()
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(write_err)
    }

    /// Apply `SIMSCOPE_*` environment overrides.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparsable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("SIMSCOPE_DATASET").filter(|s| !s.is_empty()) {
            self.dataset_path = Some(PathBuf::from(path));
        }

        if let Some(size) = lookup("SIMSCOPE_PAGE_SIZE")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.page_size = size;
        }

        if let Some(path) = lookup("SIMSCOPE_PREFERENCES").filter(|s| !s.is_empty()) {
            self.preferences_path = Some(PathBuf::from(path));
        }

        self
    }

    /// A fresh session configured with this page size and time range.
    pub fn initial_state(&self) -> SessionState {
        let mut state = SessionState::new(self.page_size);
        state.filter.time_range = self.time_range;
        state
    }
}

/// `<config_dir>/simscope/config.json`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let mut path = config_dir().ok_or(ConfigError::NoConfigDir)?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SIMSCOPE_DATASET", "/data/tree.json"),
            ("SIMSCOPE_PAGE_SIZE", "50"),
        ]
        .into();
        let config = ExplorerConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.dataset_path, Some(PathBuf::from("/data/tree.json")));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.preferences_path, None);
    }

    #[test]
    fn test_invalid_page_size_is_ignored() {
        let config = ExplorerConfig::default().with_overrides(|k| match k {
            "SIMSCOPE_PAGE_SIZE" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ExplorerConfig = serde_json::from_str(r#"{"time_range": "30d"}"#).unwrap();
        assert_eq!(config.time_range, TimeRange::Last30Days);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }
}
