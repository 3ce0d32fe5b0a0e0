//! Bootstrap configuration loading
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ACS_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and the
//! remaining tiers still apply. A file that exists but does not parse is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Largest accepted chunk size (64 KiB)
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

pub const ENV_PORT: &str = "ACS_PORT";
pub const ENV_RESOURCE_DIR: &str = "ACS_RESOURCE_DIR";
pub const ENV_STATIC_DIR: &str = "ACS_STATIC_DIR";
pub const ENV_CHUNK_SIZE: &str = "ACS_CHUNK_SIZE";
pub const ENV_PACING_MS: &str = "ACS_PACING_MS";

/// Complete bootstrap configuration as read from `acs.toml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP/WebSocket listen port
    pub port: u16,

    /// Directory holding the audio files offered for streaming
    pub resource_dir: PathBuf,

    /// Directory served as static web content
    pub static_dir: PathBuf,

    pub streaming: StreamingConfig,

    pub logging: LoggingConfig,
}

/// Per-transfer tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Bytes per binary frame
    pub chunk_size: usize,

    /// Fixed delay after every chunk
    pub pacing_ms: u64,

    /// Upper bound on a single outbound frame write
    pub send_timeout_ms: u64,

    /// Upper bound on a single chunk read
    pub read_timeout_ms: u64,

    /// How long connection teardown waits for workers to exit
    pub shutdown_timeout_ms: u64,

    /// File extensions (without dot) offered by the library
    pub extensions: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            resource_dir: PathBuf::from("./resource"),
            static_dir: PathBuf::from("./static"),
            streaming: StreamingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8192,
            pacing_ms: 20,
            send_timeout_ms: 10_000,
            read_timeout_ms: 10_000,
            shutdown_timeout_ms: 2_000,
            extensions: vec!["mp3".to_string(), "wav".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl StreamingConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Settings that may be overridden above the TOML tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub resource_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub pacing_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Read overrides from `ACS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: env_parsed(ENV_PORT)?,
            resource_dir: std::env::var_os(ENV_RESOURCE_DIR).map(PathBuf::from),
            static_dir: std::env::var_os(ENV_STATIC_DIR).map(PathBuf::from),
            chunk_size: env_parsed(ENV_CHUNK_SIZE)?,
            pacing_ms: env_parsed(ENV_PACING_MS)?,
        })
    }

    /// Combine two override sets, `self` winning where both are set
    pub fn or(self, lower: ConfigOverrides) -> Self {
        Self {
            port: self.port.or(lower.port),
            resource_dir: self.resource_dir.or(lower.resource_dir),
            static_dir: self.static_dir.or(lower.static_dir),
            chunk_size: self.chunk_size.or(lower.chunk_size),
            pacing_ms: self.pacing_ms.or(lower.pacing_ms),
        }
    }
}

fn env_parsed<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {}={:?}: {}", name, value, e))),
        Err(_) => Ok(None),
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load a TOML file, returning `None` if it does not exist
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(None);
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(Some(config))
    }

    /// Apply overrides on top of this configuration
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(dir) = overrides.resource_dir {
            self.resource_dir = dir;
        }
        if let Some(dir) = overrides.static_dir {
            self.static_dir = dir;
        }
        if let Some(size) = overrides.chunk_size {
            self.streaming.chunk_size = size;
        }
        if let Some(ms) = overrides.pacing_ms {
            self.streaming.pacing_ms = ms;
        }
        self
    }

    /// Reject values the streamer cannot run with
    pub fn validate(&self) -> Result<()> {
        let chunk_size = self.streaming.chunk_size;
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::Config(format!(
                "chunk_size must be between 1 and {} bytes, got {}",
                MAX_CHUNK_SIZE, chunk_size
            )));
        }
        if self.streaming.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(Error::Config(
                "at least one audio file extension is required".to_string(),
            ));
        }
        if self.streaming.send_timeout_ms == 0 || self.streaming.read_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Default location of `acs.toml` for the platform
///
/// Linux: `~/.config/acs/acs.toml`, falling back to `/etc/acs/acs.toml`
/// when only the system-wide file exists.
pub fn default_config_path() -> PathBuf {
    let user_config = dirs::config_dir().map(|d| d.join("acs").join("acs.toml"));

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/acs/acs.toml");
        match user_config {
            Some(path) if path.exists() => return path,
            _ if system_config.exists() => return system_config,
            _ => {}
        }
    }

    user_config.unwrap_or_else(|| PathBuf::from("acs.toml"))
}

/// Resolve the full configuration
///
/// `config_path` of `None` uses [`default_config_path`]. `cli` holds the
/// command-line tier; the environment tier is read here.
pub fn resolve(config_path: Option<&Path>, cli: ConfigOverrides) -> Result<TomlConfig> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let base = TomlConfig::load_optional(&path)?.unwrap_or_default();
    let overrides = cli.or(ConfigOverrides::from_env()?);
    let config = base.with_overrides(overrides);
    config.validate()?;
    Ok(config)
}
