//! Configuration loading
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ATTRIB_HUB_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error; the remaining layers still apply.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "ATTRIB_HUB_CONFIG";

const ENV_BIND_ADDR: &str = "ATTRIB_HUB_BIND_ADDR";
const ENV_PORT: &str = "ATTRIB_HUB_PORT";
const ENV_WINDOW_CAPACITY: &str = "ATTRIB_HUB_WINDOW_CAPACITY";
const ENV_KEEPALIVE_SECS: &str = "ATTRIB_HUB_KEEPALIVE_SECS";
const ENV_MAX_BODY_BYTES: &str = "ATTRIB_HUB_MAX_BODY_BYTES";
const ENV_LISTENER_WARN_THRESHOLD: &str = "ATTRIB_HUB_LISTENER_WARN_THRESHOLD";

/// Resolved hub configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Interface to bind the HTTP server to
    pub bind_addr: String,
    pub port: u16,
    /// Number of most recent traces retained by the event store
    pub window_capacity: usize,
    /// Seconds between SSE keep-alive comments
    pub keepalive_secs: u64,
    /// Upper bound on an ingestion request body
    pub max_body_bytes: usize,
    /// Live listener count above which a warning is logged per new subscriber
    pub listener_warn_threshold: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 4318,
            window_capacity: 100,
            keepalive_secs: 30,
            max_body_bytes: 2 * 1024 * 1024,
            listener_warn_threshold: 256,
        }
    }
}

impl HubConfig {
    /// `host:port` string suitable for `TcpListener::bind`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(Error::Config("bind_addr must not be empty".to_string()));
        }
        if self.window_capacity == 0 {
            return Err(Error::Config("window_capacity must be at least 1".to_string()));
        }
        if self.keepalive_secs == 0 {
            return Err(Error::Config("keepalive_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// One layer of optional settings
///
/// Used for the TOML file contents, the environment, and command-line flags.
/// Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigLayer {
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
    pub window_capacity: Option<usize>,
    pub keepalive_secs: Option<u64>,
    pub max_body_bytes: Option<usize>,
    pub listener_warn_threshold: Option<usize>,
}

impl ConfigLayer {
    /// Read the `ATTRIB_HUB_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: std::env::var(ENV_BIND_ADDR).ok(),
            port: env_parse(ENV_PORT)?,
            window_capacity: env_parse(ENV_WINDOW_CAPACITY)?,
            keepalive_secs: env_parse(ENV_KEEPALIVE_SECS)?,
            max_body_bytes: env_parse(ENV_MAX_BODY_BYTES)?,
            listener_warn_threshold: env_parse(ENV_LISTENER_WARN_THRESHOLD)?,
        })
    }

    /// Parse a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Field-wise merge: values in `self` win over `lower`
    pub fn or(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            bind_addr: self.bind_addr.or(lower.bind_addr),
            port: self.port.or(lower.port),
            window_capacity: self.window_capacity.or(lower.window_capacity),
            keepalive_secs: self.keepalive_secs.or(lower.keepalive_secs),
            max_body_bytes: self.max_body_bytes.or(lower.max_body_bytes),
            listener_warn_threshold: self.listener_warn_threshold.or(lower.listener_warn_threshold),
        }
    }

    /// Fill unset fields from the compiled defaults
    pub fn into_config(self) -> HubConfig {
        let defaults = HubConfig::default();
        HubConfig {
            bind_addr: self.bind_addr.unwrap_or(defaults.bind_addr),
            port: self.port.unwrap_or(defaults.port),
            window_capacity: self.window_capacity.unwrap_or(defaults.window_capacity),
            keepalive_secs: self.keepalive_secs.unwrap_or(defaults.keepalive_secs),
            max_body_bytes: self.max_body_bytes.unwrap_or(defaults.max_body_bytes),
            listener_warn_threshold: self
                .listener_warn_threshold
                .unwrap_or(defaults.listener_warn_threshold),
        }
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Default config file location: `<config_dir>/attrib-hub/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("attrib-hub").join("config.toml"))
}

/// Resolve the full configuration
///
/// `cli` holds command-line flags; `config_path` is an explicit config file
/// (from `--config`). Without one, `ATTRIB_HUB_CONFIG` and then the default
/// location are tried.
pub fn resolve(cli: ConfigLayer, config_path: Option<&Path>) -> Result<HubConfig> {
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .or_else(default_config_path);

    let file = match path {
        Some(path) if path.exists() => {
            info!("Loading config file: {}", path.display());
            ConfigLayer::from_toml_file(&path)?
        }
        Some(path) => {
            if config_path.is_some() {
                warn!("Config file not found: {} (using defaults)", path.display());
            } else {
                info!("No config file at {} (using defaults)", path.display());
            }
            ConfigLayer::default()
        }
        None => ConfigLayer::default(),
    };

    let config = cli.or(ConfigLayer::from_env()?).or(file).into_config();
    config.validate()?;
    Ok(config)
}
