//! # Configuration Management
//!
//! Centralized configuration for the serialization stage.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Environment
//! - `CJDROUTE_PIPE`: when present (any value) the diagnostic tap is enabled
//! - `DHT_SERIALIZATION_TAP_PATH`: overrides the tap path
//!
//! ## Security Considerations
//! - The tap FIFO is created owner/group only (`0o770`) by default
//! - Encoded size and nesting depth limits bound per-message work

use crate::core::bencode::DEFAULT_MAX_DEPTH;
use crate::error::{Result, StageError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Well-known path of the diagnostic FIFO
pub const DEFAULT_TAP_PATH: &str = "/tmp/cjdroute_pipe";

/// Permission bits for a newly created FIFO
pub const DEFAULT_FIFO_MODE: u32 = 0o770;

/// Environment variable whose presence enables the tap
pub const TAP_ENABLE_ENV: &str = "CJDROUTE_PIPE";

/// Environment variable overriding the tap path
pub const TAP_PATH_ENV: &str = "DHT_SERIALIZATION_TAP_PATH";

/// Max allowed encoded message size (64 KB, a full UDP datagram)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Upper bound accepted for `max_depth`
pub const MAX_DEPTH_LIMIT: usize = 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StageConfig {
    /// Diagnostic tap configuration
    #[serde(default)]
    pub tap: TapConfig,

    /// Codec limits
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StageConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| StageError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| StageError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| StageError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden from the process environment
    pub fn from_env() -> Self {
        Self::from_env_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup
    pub fn from_env_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.tap.apply_env(lookup);
        config
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StageError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| StageError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.tap.validate());
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StageError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Diagnostic tap configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TapConfig {
    /// Open the FIFO for writing at startup
    pub enabled: bool,

    /// Location of the FIFO
    pub path: PathBuf,

    /// Permission bits used when the FIFO has to be created
    pub fifo_mode: u32,

    /// Also mirror encoded outgoing messages
    pub mirror_outgoing: bool,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from(DEFAULT_TAP_PATH),
            fifo_mode: DEFAULT_FIFO_MODE,
            mirror_outgoing: false,
        }
    }
}

impl TapConfig {
    /// Apply `CJDROUTE_PIPE` and `DHT_SERIALIZATION_TAP_PATH`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(TAP_ENABLE_ENV).is_some() {
            self.enabled = true;
        }
        if let Some(path) = lookup(TAP_PATH_ENV).filter(|p| !p.is_empty()) {
            self.path = PathBuf::from(path);
        }
    }

    /// Validate tap configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push("Tap path cannot be empty".to_string());
        } else if !self.path.is_absolute() {
            errors.push(format!(
                "Tap path must be absolute: '{}'",
                self.path.display()
            ));
        }

        if self.fifo_mode > 0o777 {
            errors.push(format!(
                "Invalid FIFO mode: {:o} (only permission bits are allowed)",
                self.fifo_mode
            ));
        } else if self.fifo_mode & 0o007 != 0 {
            errors.push(format!(
                "FIFO mode {:o} grants access to other users",
                self.fifo_mode
            ));
        }

        if self.mirror_outgoing && !self.enabled {
            errors.push("mirror_outgoing has no effect while the tap is disabled".to_string());
        }

        errors
    }
}

/// Codec limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest encoded message accepted on the outgoing path
    pub max_message_size: usize,

    /// Deepest nesting accepted when decoding
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CodecConfig {
    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_message_size == 0 {
            errors.push("Max message size cannot be 0".to_string());
        } else if self.max_message_size > 16 * 1024 * 1024 {
            errors.push(format!(
                "Max message size too large: {} bytes (maximum: 16 MB)",
                self.max_message_size
            ));
        }

        if self.max_depth == 0 {
            errors.push("Max depth must be greater than 0".to_string());
        } else if self.max_depth > MAX_DEPTH_LIMIT {
            errors.push(format!(
                "Max depth too large: {} (maximum: {MAX_DEPTH_LIMIT})",
                self.max_depth
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("dht-serialization"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
