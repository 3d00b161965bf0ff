//! Configuration management for huddle
//!
//! Default config location: ./huddle.toml

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Path serving POST/GET/DELETE for MCP
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Interval between SSE keep-alive comments
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Maximum request body size in bytes (default: 4MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_endpoint() -> String {
    "/mcp".to_string()
}

fn default_keep_alive_secs() -> u64 {
    15
}

fn default_max_body_size() -> usize {
    4 * 1024 * 1024 // 4MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            endpoint: default_endpoint(),
            keep_alive_secs: default_keep_alive_secs(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ServerConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpConfig {
    /// Reported as `serverInfo.name`
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_server_version")]
    pub version: String,
    /// Optional usage hint returned from `initialize`
    #[serde(default)]
    pub instructions: Option<String>,
    /// Public origin of the server, copied into widget metadata.
    /// Override with BASE_URL env var
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_server_name() -> String {
    "huddle-mcp".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
            instructions: None,
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics at GET /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,huddle=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

/// Where [`Config::load_or_create`] got its values from
#[derive(Debug)]
pub enum ConfigOrigin {
    /// Read from an existing file
    File,
    /// Defaults, written to the path
    Created,
    /// Defaults that could not be written
    Unsaved(anyhow::Error),
}

impl Config {
    /// Load config from an existing file
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load config from file path, or create default.
    ///
    /// Nothing is logged here since this usually runs before tracing is
    /// installed. The caller reports the returned [`ConfigOrigin`].
    pub fn load_or_create(config_path: &Path) -> Result<(Self, ConfigOrigin)> {
        if config_path.exists() {
            return Ok((Self::load(config_path)?, ConfigOrigin::File));
        }

        let mut config = Config::default();
        let origin = match config.save(config_path) {
            Ok(()) => ConfigOrigin::Created,
            Err(e) => ConfigOrigin::Unsaved(e),
        };
        config.apply_env();
        Ok((config, origin))
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment overrides (BASE_URL)
    pub fn apply_env(&mut self) {
        self.apply_base_url(std::env::var("BASE_URL").ok());
    }

    pub fn apply_base_url(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.mcp.base_url = url.trim().trim_end_matches('/').to_string();
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.server.endpoint.starts_with('/') {
            return Err(anyhow!(
                "server.endpoint must start with '/', got {:?}",
                self.server.endpoint
            ));
        }
        if self.server.endpoint == "/health" || self.server.endpoint == "/metrics" {
            return Err(anyhow!(
                "server.endpoint {:?} collides with a built-in route",
                self.server.endpoint
            ));
        }
        Ok(())
    }
}
