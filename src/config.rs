//! TOML configuration for the server, client and logging.
//!
//! Resolution: `TASKBOARD_CONFIG` if set, else `$HOME/.config/taskboard/config.toml`.
//! A missing file means defaults. A broken file also means defaults, with the error
//! handed back so the caller can report it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::DeletePolicy;

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_ENV_VAR: &str = "TASKBOARD_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HOME is not set")]
    NoHome,
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub database: PathBuf,
    pub delete_policy: DeletePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen: "127.0.0.1:7878".into(),
            database: PathBuf::from("taskboard.db"),
            delete_policy: DeletePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://127.0.0.1:7878".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Where the dashboard writes its log, since stderr belongs to the terminal.
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".into(),
            file: std::env::temp_dir().join("taskboard.log"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub log: LogConfig,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<ConfigError>,
}

/// Values given on the command line. Anything set wins over the file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub listen: Option<String>,
    pub base_url: Option<String>,
    pub delete_policy: Option<DeletePolicy>,
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("taskboard")
        .join(CONFIG_FILE_NAME))
}

/// Load from `explicit` if given, else from [`config_path`], falling back to defaults.
pub fn load_config_with_fallback(explicit: Option<&Path>) -> ConfigLoad {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Ok(p) => p,
            Err(err) => {
                return ConfigLoad {
                    config: Config::default(),
                    error: Some(err),
                }
            }
        },
    };
    load_config_with_fallback_from_path(&path)
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }
    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

pub fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(db) = overrides.database.as_ref() {
        merged.server.database = db.clone();
    }
    if let Some(listen) = overrides.listen.as_ref() {
        merged.server.listen = listen.clone();
    }
    if let Some(url) = overrides.base_url.as_ref() {
        merged.client.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(policy) = overrides.delete_policy {
        merged.server.delete_policy = policy;
    }
    merged
}
