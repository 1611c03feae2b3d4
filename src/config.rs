use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{RenderError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address for the HTTP surface.
    pub bind: SocketAddr,
    /// Request bodies above this size are rejected with 413 before any
    /// rendering resource is touched.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Budget for loading content into a session.
    #[serde(with = "humantime_serde")]
    pub load_timeout: Duration,
    /// Budget for emitting the artifact from a loaded session.
    #[serde(with = "humantime_serde")]
    pub emit_timeout: Duration,
    /// Cap on simultaneous renders across both modes. `None` imposes no
    /// limit, matching the historical behavior of this service.
    pub max_concurrent: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(25),
            emit_timeout: Duration::from_secs(20),
            max_concurrent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Explicit Chromium executable; auto-detected when absent.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Extra process arguments passed through to the engine.
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Base log level (trace|debug|info|warn|error).
    pub level: String,
    /// Emit JSON log lines instead of the compact format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        let cfg: Config = toml::from_str(&raw).map_err(|e| {
            RenderError::Config(format!("invalid config {}: {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.render.load_timeout.is_zero() {
            return Err(RenderError::Config(
                "render.load_timeout must be greater than zero".to_string(),
            ));
        }
        if self.render.emit_timeout.is_zero() {
            return Err(RenderError::Config(
                "render.emit_timeout must be greater than zero".to_string(),
            ));
        }
        if self.render.max_concurrent == Some(0) {
            return Err(RenderError::Config(
                "render.max_concurrent must be at least 1 when set".to_string(),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(RenderError::Config(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
