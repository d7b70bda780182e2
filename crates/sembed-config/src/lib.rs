//! Configuration for the sembed server and client.
//!
//! Values come from one TOML file (an explicit path, or
//! `<user config dir>/sembed/config.toml` when present) and are then
//! overridden by environment variables. Every section is optional in the file.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const API_KEY_ENV: &str = "SHORT_EMBEDDINGS_API_KEY";
pub const URL_ENV: &str = "SEMBED_URL";
pub const PORT_ENV: &str = "SEMBED_PORT";

pub const DEFAULT_PORT: u16 = 699;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub server: ServerConfig,
    pub gate: GateConfig,
    pub model: ModelConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Return the full inference diagnostic to callers instead of a generic
    /// category. The diagnostic is always logged.
    pub expose_inference_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            expose_inference_errors: false,
        }
    }
}

impl ServerConfig {
    /// Resolves `bind_address` (an IPv4/IPv6 literal or a host name) with
    /// `port`. Host names resolve to their first address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let invalid = |reason: String| {
            ConfigError::Invalid(format!(
                "bind address '{}' port {}: {reason}",
                self.bind_address, self.port
            ))
        };
        (self.bind_address.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("resolved to no addresses".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub max_concurrent_inferences: usize,
    pub acquire_timeout_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_concurrent_inferences: 4,
            acquire_timeout_ms: 2000,
        }
    }
}

impl GateConfig {
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "all-minilm-l6-v2".to_string(),
            cache_dir: None,
            show_download_progress: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://127.0.0.1:{DEFAULT_PORT}"),
        }
    }
}

impl Config {
    /// Load from `path` (which must exist) or from the user config dir, apply
    /// environment overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_file(path)?,
            None => Self::load_global()?,
        };
        let config = config.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn global_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "sembed")
            .map(|d| d.config_dir().join("config.toml"))
    }

    fn load_global() -> Result<Self> {
        match Self::global_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides read through `lookup` (normally `std::env::var`).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(URL_ENV) {
            self.client.base_url = url;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: PORT_ENV,
                value: port,
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gate.max_concurrent_inferences == 0 {
            return Err(ConfigError::Invalid(
                "gate.max_concurrent_inferences must be at least 1".into(),
            ));
        }
        if self.gate.acquire_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "gate.acquire_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Invalid("model.name cannot be empty".into()));
        }
        Ok(())
    }

    /// The configured key, treating an empty string as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}
