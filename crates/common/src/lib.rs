//! DevAssist Common Library
//!
//! Shared code for the DevAssist crates including:
//! - Configuration management
//! - Error types and codes
//! - Tracing initialisation
//! - Metrics helpers

pub mod config;
pub mod errors;
pub mod metrics;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, ErrorCode, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default prefix for synthesized storage paths
pub const DEFAULT_STORAGE_PREFIX: &str = "uploads";

/// Default bound on concurrent extractions within one batch
pub const DEFAULT_MAX_CONCURRENT_EXTRACTIONS: usize = 4;
