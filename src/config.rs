//! Application configuration.
//!
//! Read from `config.toml` in the platform config directory unless a path is
//! given on the command line. Every field has a default, so a partial file
//! (or no file at all) is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const APP_ID: &str = "doppler_tui";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("request_byte must be a single ASCII character, got {0:?}")]
    InvalidRequestByte(String),
    #[error("request_interval_ms must be greater than zero")]
    ZeroRequestInterval,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port_name: String,
    pub baud_rate: u32,
    pub request_byte: String,
    pub request_interval_ms: u64,
    pub export_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port_name: "COM3".to_string(),
            baud_rate: 57_600,
            request_byte: "R".to_string(),
            request_interval_ms: 2_000,
            export_path: PathBuf::from("results.csv"),
            log_dir: default_log_dir(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

fn default_log_dir() -> PathBuf {
    dirs_next::data_dir()
        .map(|p| p.join(APP_ID).join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `path`, or from the default location when none is given.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.request_byte()?;
        if self.request_interval_ms == 0 {
            return Err(ConfigError::ZeroRequestInterval);
        }
        Ok(())
    }

    pub fn request_byte(&self) -> Result<u8, ConfigError> {
        match self.request_byte.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::InvalidRequestByte(self.request_byte.clone())),
        }
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}
