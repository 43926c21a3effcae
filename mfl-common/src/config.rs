//! Configuration loading and resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MFL_CONFIG`)
//! 3. Platform config file (`<config_dir>/mfl/loader.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: the loader logs a warning and
//! starts with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MFL_CONFIG";

/// Loader configuration (TOML)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Ceiling on outstanding enrichment operations in standard mode
    pub max_concurrent: usize,
    /// Total attempts per enrichment operation (first try included)
    pub retry_attempts: u32,
    /// Base delay before the first retry
    pub retry_base_delay_ms: u64,
    /// Upper bound on any single retry delay
    pub retry_max_delay_ms: u64,
    /// Minimum similarity for a fuzzy sidecar match (0.0-1.0)
    pub fuzzy_match_threshold: f64,
    /// Entries per chunk in standard mode
    pub chunk_size: usize,
    /// Stub-first progressive delivery
    pub progressive_mode: bool,
    /// Entries enriched in the priority phase
    pub priority_count: usize,
    /// Duration probe timeout
    pub duration_probe_timeout_ms: u64,
    /// Extensions classified as primary media (lower case, no dot)
    pub primary_extensions: Vec<String>,
    /// Optional TOML file with per-file metadata overrides
    pub overrides_file: Option<PathBuf>,
    /// EventBus channel capacity
    pub event_capacity: usize,
    /// HTTP bind address for `serve`
    pub bind_address: String,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Default primary media extensions
pub fn default_primary_extensions() -> Vec<String> {
    ["mp3", "flac", "ogg", "oga", "m4a", "aac", "mp4", "wav", "opus", "wma"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            retry_attempts: 2,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 10_000,
            fuzzy_match_threshold: 0.8,
            chunk_size: 10,
            progressive_mode: true,
            priority_count: 3,
            duration_probe_timeout_ms: 3500,
            primary_extensions: default_primary_extensions(),
            overrides_file: None,
            event_capacity: 100,
            bind_address: "127.0.0.1:5731".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoaderConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::Config("max_concurrent must be at least 1".to_string()));
        }
        if self.retry_attempts == 0 {
            return Err(Error::Config("retry_attempts must be at least 1".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_match_threshold) {
            return Err(Error::Config(format!(
                "fuzzy_match_threshold must be within 0.0-1.0, got {}",
                self.fuzzy_match_threshold
            )));
        }
        if self.retry_max_delay_ms < self.retry_base_delay_ms {
            return Err(Error::Config(
                "retry_max_delay_ms must not be below retry_base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Write configuration to a TOML file
///
/// Writes to a sibling temp file first and renames it into place.
pub fn write_toml_config(config: &LoaderConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolves which config file (if any) to load
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create resolver with an optional command-line override
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Locate the config file following the priority order
    pub fn locate(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config file
        default_config_path().filter(|p| p.exists())
    }

    /// Resolve the effective configuration
    ///
    /// A missing file falls back to defaults with a warning. A file that
    /// exists but fails to parse or validate is an error.
    pub fn resolve(&self) -> Result<LoaderConfig> {
        match self.locate() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                LoaderConfig::load(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(LoaderConfig::default())
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok(LoaderConfig::default())
            }
        }
    }
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mfl").join("loader.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.retry_base_delay_ms, 1000);
        assert_eq!(config.fuzzy_match_threshold, 0.8);
        assert_eq!(config.priority_count, 3);
        assert!(config.primary_extensions.contains(&"mp3".to_string()));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = LoaderConfig::from_toml_str("max_concurrent = 5\n").unwrap();
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let result = LoaderConfig::from_toml_str("fuzzy_match_threshold = 1.5\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = LoaderConfig {
            max_concurrent: 0,
            ..LoaderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(LoaderConfig::from_toml_str("max_concurrent = ").is_err());
    }
}
