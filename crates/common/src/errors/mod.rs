//! Error types for DevAssist crates
//!
//! Provides a shared error handling system with:
//! - Distinct error types for different failure modes
//! - Error codes for client handling
//! - Structured error reports

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Upload admission errors (2xxx)
    CountLimitExceeded,
    FileRejected,
    UploadInProgress,

    // Extraction errors (3xxx)
    ExtractionFailed,
    UnsupportedFormat,
    ExtractionTimeout,

    // Resource errors (4xxx)
    FileNotFound,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::CountLimitExceeded => 2001,
            ErrorCode::FileRejected => 2002,
            ErrorCode::UploadInProgress => 2003,

            ErrorCode::ExtractionFailed => 3001,
            ErrorCode::UnsupportedFormat => 3002,
            ErrorCode::ExtractionTimeout => 3003,

            ErrorCode::FileNotFound => 4001,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }

    /// Codes the user can act on (as opposed to faults in the tool itself)
    pub fn is_user_facing(&self) -> bool {
        self.as_code() < 9000
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::FileNotFound { .. } => ErrorCode::FileNotFound,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }
}

/// Structured, serializable error description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub numeric_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            numeric_code: code.as_code(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::FileNotFound { path: "spec.pdf".into() };
        assert_eq!(err.code(), ErrorCode::FileNotFound);
        assert_eq!(err.code().as_code(), 4001);
        assert!(err.code().is_user_facing());
    }

    #[test]
    fn test_configuration_error_is_internal() {
        let err = AppError::Configuration {
            message: "bad value".into(),
        };
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
        assert!(!err.code().is_user_facing());
    }

    #[test]
    fn test_report_serialization() {
        let report = ErrorReport::new(ErrorCode::CountLimitExceeded, "too many files")
            .with_details(serde_json::json!({ "max": 2 }));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["code"], "COUNT_LIMIT_EXCEEDED");
        assert_eq!(json["numeric_code"], 2001);
        assert_eq!(json["details"]["max"], 2);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AppError = io.into();
        assert_eq!(err.code(), ErrorCode::IoError);
    }
}
