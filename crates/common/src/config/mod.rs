//! Configuration management for DevAssist crates
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::errors::{AppError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct AppConfig {
    /// Upload zone configuration
    #[serde(default)]
    #[validate(nested)]
    pub upload: UploadConfig,

    /// Text extraction configuration
    #[serde(default)]
    #[validate(nested)]
    pub extraction: ExtractionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UploadConfig {
    /// Accept patterns: `.ext`, `type/subtype` or `type/*`
    #[serde(default = "default_accept")]
    pub accept: Vec<String>,

    /// Per-file size limit in bytes (None disables the check)
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: Option<u64>,

    /// Bound on concurrent extractions within one batch
    #[serde(default = "default_max_concurrent_extractions")]
    #[validate(range(min = 1, max = 64))]
    pub max_concurrent_extractions: usize,

    /// Per-file extraction timeout in seconds (None waits indefinitely)
    #[serde(default)]
    pub extraction_timeout_secs: Option<u64>,

    /// Prefix for synthesized storage paths
    #[serde(default = "default_storage_prefix")]
    #[validate(length(min = 1, max = 256))]
    pub storage_prefix: String,

    /// Maximum number of files per document category
    #[serde(default)]
    pub limits: CategoryLimits,
}

/// Maximum file count for each document category
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryLimits {
    #[serde(default = "default_specification_limit")]
    pub specification: Option<usize>,

    #[serde(default = "default_proposal_limit")]
    pub proposal: Option<usize>,

    #[serde(default)]
    pub supplementary: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ExtractionConfig {
    /// Extracted text is truncated to this many characters
    #[serde(default = "default_max_text_chars")]
    #[validate(range(min = 1))]
    pub max_text_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive (debug, info, devassist_upload=trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Service name attached to log output
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_accept() -> Vec<String> {
    [".pdf", ".txt", ".md", ".markdown", ".csv", ".json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_max_file_size() -> Option<u64> { Some(50 * 1024 * 1024) }
fn default_max_concurrent_extractions() -> usize { crate::DEFAULT_MAX_CONCURRENT_EXTRACTIONS }
fn default_storage_prefix() -> String { crate::DEFAULT_STORAGE_PREFIX.to_string() }
fn default_specification_limit() -> Option<usize> { Some(1) }
fn default_proposal_limit() -> Option<usize> { Some(10) }
fn default_max_text_chars() -> usize { 102_400 }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "devassist-upload".to_string() }

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            accept: default_accept(),
            max_file_size_bytes: default_max_file_size(),
            max_concurrent_extractions: default_max_concurrent_extractions(),
            extraction_timeout_secs: None,
            storage_prefix: default_storage_prefix(),
            limits: CategoryLimits::default(),
        }
    }
}

impl Default for CategoryLimits {
    fn default() -> Self {
        Self {
            specification: default_specification_limit(),
            proposal: default_proposal_limit(),
            supplementary: None,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // e.g., APP__UPLOAD__MAX_CONCURRENT_EXTRACTIONS=8
            .add_source(Self::environment())
            .build()?;

        Self::finish(config)
    }

    /// Load from a specific file, still honouring APP__ overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Self::environment())
            .build()?;

        Self::finish(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("upload.accept")
    }

    fn finish(config: Config) -> Result<Self> {
        let loaded: AppConfig = config.try_deserialize()?;
        loaded.validate().map_err(|e| AppError::Configuration {
            message: e.to_string(),
        })?;
        Ok(loaded)
    }

    /// Get the per-file extraction timeout as Duration
    pub fn extraction_timeout(&self) -> Option<Duration> {
        self.upload.extraction_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.upload.max_concurrent_extractions, 4);
        assert_eq!(config.upload.limits.specification, Some(1));
        assert_eq!(config.upload.limits.supplementary, None);
        assert!(config.upload.accept.iter().any(|p| p == ".pdf"));
        assert!(config.extraction_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.upload.max_concurrent_extractions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[upload]\nmax_concurrent_extractions = 2\nextraction_timeout_secs = 15\n\n[upload.limits]\nproposal = 3"
        )
        .unwrap();

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.upload.max_concurrent_extractions, 2);
        assert_eq!(config.upload.limits.proposal, Some(3));
        assert_eq!(config.upload.limits.specification, Some(1));
        assert_eq!(config.extraction_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.toml");
        std::fs::write(&path, "[upload]\nmax_concurrent_extractions = 0\n").unwrap();

        let err = AppConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}
