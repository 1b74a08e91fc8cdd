//! Configuration management for study-delta
//!
//! Settings come from defaults, an optional `study-delta.toml` file and
//! `SD_*` environment overrides, in that order.

use crate::core::error::{Error, Result};
use crate::delta::OutputSettings;
use crate::format::Compression;
use serde::{Deserialize, Serialize};

/// Config file looked up by [`Config::load`]
pub const CONFIG_FILE: &str = "study-delta.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Memento emission settings
    pub output: OutputSettings,

    /// Stream filter configuration
    pub stream: StreamConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Stream filter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Compression applied when writing mementos.
    /// Files ending in `.gz` are always gzip encoded.
    pub compression: Compression,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and config file
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file first
        if std::path::Path::new(CONFIG_FILE).exists() {
            config = Self::from_file(CONFIG_FILE)?;
        }

        // Override with environment variables
        config.apply_overrides(|key| std::env::var(key).ok())?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply `SD_*` overrides, reading variables through `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(max) = lookup("SD_MAX_TAG_LENGTH") {
            self.output.max_tag_length = max.parse()
                .map_err(|e| Error::config(format!("Invalid max tag length: {}", e)))?;
        }

        if let Some(compression) = lookup("SD_COMPRESSION") {
            self.stream.compression = compression.parse()?;
        }

        if let Some(compact) = lookup("SD_COMPACT") {
            self.output.compact = match compact.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => return Err(Error::config(format!("Invalid compact flag: {}", other))),
            };
        }

        if let Some(level) = lookup("SD_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {},
            _ => return Err(Error::config("Invalid log level")),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {},
            _ => return Err(Error::config("Invalid log format")),
        }

        Ok(())
    }
}
