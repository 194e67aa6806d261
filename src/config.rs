//! Configuration module for the atermscan scanner

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the per-user config file looked up in the home directory
pub const DEFAULT_CONFIG_FILE: &str = ".atermscan.toml";

/// Main configuration structure for scanning operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Target address or network to scan
    pub target: String,

    /// Timeout for each device probe in milliseconds
    pub timeout: u64,

    /// Maximum number of probes in flight
    pub concurrency: usize,

    /// HTTP port of the device query endpoint
    pub port: u16,

    /// Overall deadline for the whole scan in milliseconds
    pub deadline: Option<u64>,

    /// Report failures that are not plain "nobody home" noise
    pub verbose: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: "192.168.1.0/24".to_string(),
            timeout: 8000,
            concurrency: 256, // a whole /24 at once
            port: 80,
            deadline: None,
            verbose: true,
        }
    }
}

impl ScanConfig {
    /// Create a new scan configuration
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Set the per-device timeout in milliseconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the concurrency limit
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the device HTTP port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the overall deadline in milliseconds
    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Get the per-device timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Get the overall deadline as Duration
    pub fn deadline_duration(&self) -> Option<Duration> {
        self.deadline.map(Duration::from_millis)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ScanError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: ScanConfig = toml::from_str(&content)
            .map_err(|e| ScanError::ConfigError(format!("Failed to parse TOML: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from `~/.atermscan.toml`, falling back to defaults
    pub fn load_default_config() -> Self {
        let Some(home_dir) = dirs::home_dir() else {
            return Self::default();
        };

        let path = home_dir.join(DEFAULT_CONFIG_FILE);
        if path.exists() {
            match Self::from_toml_file(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.target.trim().is_empty() {
            return Err(ScanError::ConfigError("Target cannot be empty".to_string()));
        }

        if self.concurrency == 0 {
            return Err(ScanError::ConfigError(
                "Concurrency limit must be greater than 0".to_string(),
            ));
        }

        if self.timeout == 0 {
            return Err(ScanError::ConfigError(
                "Device timeout must be greater than 0".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(ScanError::ConfigError("Port cannot be 0".to_string()));
        }

        Ok(())
    }
}
