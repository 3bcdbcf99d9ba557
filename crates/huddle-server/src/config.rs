//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (HUDDLE_HOST, HUDDLE_PORT)
//! - TOML configuration file
//! - The `--config` command line argument

use anyhow::{Context, Result};
use huddle_core::{HubConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Hub tuning.
    #[serde(default)]
    pub hub: HubSection,

    /// Per-session settings.
    #[serde(default)]
    pub session: SessionSection,

    /// Cross-origin policy.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSection {
    /// Pending coordinator events before submitters wait.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Outbound queue capacity per session.
    #[serde(default = "default_session_queue_capacity")]
    pub session_queue_capacity: usize,

    /// How long fan-out waits on one full queue before dropping, in milliseconds.
    #[serde(default = "default_enqueue_timeout")]
    pub enqueue_timeout_ms: u64,
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    /// Disconnect sessions silent for this long, in milliseconds. Unset means never.
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,

    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the HTTP API.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("HUDDLE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("HUDDLE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
}

fn default_true() -> bool {
    true
}

fn default_event_queue_capacity() -> usize {
    64
}

fn default_session_queue_capacity() -> usize {
    huddle_core::session::DEFAULT_QUEUE_CAPACITY
}

fn default_enqueue_timeout() -> u64 {
    250
}

fn default_max_message_size() -> usize {
    64 * 1024 // 64 KB
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            hub: HubSection::default(),
            session: SessionSection::default(),
            cors: CorsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            event_queue_capacity: default_event_queue_capacity(),
            session_queue_capacity: default_session_queue_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            idle_timeout_ms: None,
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or else from the default
    /// locations, or else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let config_paths = [
            "huddle.toml",
            "/etc/huddle/huddle.toml",
            "~/.config/huddle/huddle.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    /// Hub settings.
    #[must_use]
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            event_queue_capacity: self.hub.event_queue_capacity,
            enqueue_timeout: Duration::from_millis(self.hub.enqueue_timeout_ms),
        }
    }

    /// Session settings.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            queue_capacity: self.hub.session_queue_capacity,
            idle_timeout: self.session.idle_timeout_ms.map(Duration::from_millis),
        }
    }
}
