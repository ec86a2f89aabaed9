//! Server configuration module
//!
//! Parses server configuration from YAML files. Every field has a default,
//! so an empty document is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    // ============================================
    // Listener
    // ============================================
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,

    #[serde(default = "default_port")]
    pub port: u16,

    // ============================================
    // Connection handling
    // ============================================
    /// How long a connection blocks on a read before re-checking for shutdown
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bytes requested per socket read
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    /// Longest unterminated frame accepted before it is discarded
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

// ============================================
// Default value functions
// These are called by serde when a field is missing
// ============================================

fn default_bind_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5555
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_read_buffer_size() -> usize {
    1024
}

fn default_max_frame_len() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: default_bind_ip(),
            port: default_port(),
            poll_interval_ms: default_poll_interval_ms(),
            read_buffer_size: default_read_buffer_size(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_str(contents: &str) -> Result<Self> {
        // an empty document deserialises to unit, not to a map
        let config: ServerConfig = if contents.trim().is_empty() {
            ServerConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML")?
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.bind_ip.is_empty(), "bind_ip cannot be empty");
        anyhow::ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        anyhow::ensure!(self.read_buffer_size > 0, "read_buffer_size must be positive");
        anyhow::ensure!(
            self.max_frame_len >= self.read_buffer_size,
            "max_frame_len ({}) must be at least read_buffer_size ({})",
            self.max_frame_len,
            self.read_buffer_size
        );
        Ok(())
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(&self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config to {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
