//! Configuration management for csbackup
//!
//! This module handles loading, parsing, and validating configuration from:
//! - Configuration files (TOML format)
//! - Environment variables and command-line arguments (applied by `cli`)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! The resulting [`BackupConfig`] is built once and handed to the export
//! engine by reference; nothing reads configuration from global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::storage::is_valid_key;

/// Largest page the search service will return in one query.
pub const MAX_PAGE_SIZE: u32 = 10_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackupConfig {
    /// Destination configuration
    #[serde(default)]
    pub target: TargetConfig,

    /// Search service configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Export behavior configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the backup is written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// Destination bucket name
    #[serde(default)]
    pub bucket: String,

    /// Region of the bucket, also recorded in the backup summary
    #[serde(default)]
    pub region: String,

    /// Object storage provider
    #[serde(default)]
    pub store: StoreKind,

    /// Root directory of the local object store
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,
}

/// Object storage provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Amazon S3 or an S3-compatible service.
    #[default]
    S3,

    /// A local directory, one subdirectory per bucket.
    Local,
}

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Search endpoint of the index domain
    #[serde(default)]
    pub endpoint: String,

    /// Maximum number of records per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// Export behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// Fixed key vs date/time-partitioned keys
    #[serde(default)]
    pub run_mode: RunMode,

    /// One consolidated file vs one object per batch
    #[serde(default)]
    pub output_mode: OutputMode,

    /// Name of the consolidated backup or the manifest
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Text encoding of the produced objects
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Directory for the local scratch buffer (system temp dir if unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Show a progress spinner on stderr
    #[serde(default)]
    pub show_progress: bool,
}

/// Key naming mode
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Every run overwrites the same fixed key.
    OneShot,

    /// Every run writes under a `{date}/{time}/` prefix.
    #[default]
    TimePartitioned,
}

/// Output strategy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Buffer every batch locally, upload one JSON array.
    #[default]
    SingleFile,

    /// Upload each batch as its own object plus a manifest.
    PerBatch,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_store_root() -> PathBuf {
    PathBuf::from("backups")
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_request_timeout() -> u64 {
    60
}

fn default_file_name() -> String {
    "csbackup.json".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: String::new(),
            store: StoreKind::default(),
            store_root: default_store_root(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            page_size: default_page_size(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            output_mode: OutputMode::default(),
            file_name: default_file_name(),
            encoding: default_encoding(),
            scratch_dir: None,
            show_progress: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl BackupConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file, or defaults when no path is given
    ///
    /// # Arguments
    /// * `path` - Optional path to the configuration file
    ///
    /// # Returns
    /// * `Result<BackupConfig>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// Runs before any page is fetched, so a bad key name cannot surface
    /// only after batches were already uploaded.
    pub fn validate(&self) -> Result<()> {
        if self.target.bucket.trim().is_empty() {
            return Err(ConfigError::MissingField("target.bucket".to_string()).into());
        }
        if self.search.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("search.endpoint".to_string()).into());
        }

        let page_size = self.search.page_size;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "search.page_size".to_string(),
                value: page_size.to_string(),
            }
            .into());
        }

        let file_name = &self.export.file_name;
        if file_name.trim().is_empty() || !is_valid_key(file_name) {
            return Err(ConfigError::InvalidValue {
                field: "export.file_name".to_string(),
                value: file_name.clone(),
            }
            .into());
        }

        if !is_utf8_label(&self.export.encoding) {
            return Err(ConfigError::UnsupportedEncoding(self.export.encoding.clone()).into());
        }

        Ok(())
    }

    /// Directory used for the local scratch buffer
    pub fn scratch_dir(&self) -> PathBuf {
        self.export
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Get the search request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.search.request_timeout)
    }
}

fn is_utf8_label(label: &str) -> bool {
    matches!(label.to_ascii_lowercase().as_str(), "utf-8" | "utf8")
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl OutputMode {
    /// Check if batches are buffered into one object
    pub fn is_single_file(&self) -> bool {
        matches!(self, OutputMode::SingleFile)
    }
}
