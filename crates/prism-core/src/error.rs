//! Error types for the Prism color analysis pipeline.
//!
//! The taxonomy mirrors the failure model of the pipeline: configuration
//! errors are fatal at construction time and abort before any stage starts;
//! pipeline errors are per-unit, carry the offending location, and are
//! recovered inside the stages by dropping the unit.

use thiserror::Error;

/// Top-level error type for Prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors. Always construction-time: no partial
/// pipeline is started once one of these surfaces.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Per-unit pipeline errors, organized by stage.
///
/// None of these halt the run: the affected unit is logged and dropped from
/// the stream, and the pipeline continues with the remaining units.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image retrieval failed (network error, HTTP error status, read error)
    #[error("Fetch error for {location}: {message}")]
    Fetch { location: String, message: String },

    /// Downloaded body exceeds the configured size limit
    #[error("Download too large for {location}: {size_mb}MB > {max_mb}MB")]
    TooLarge {
        location: String,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image decoding failed
    #[error("Decode error for {location}: {message}")]
    Decode { location: String, message: String },

    /// A stage operation timed out
    #[error("Timeout in {stage} stage for {location} after {timeout_ms}ms")]
    Timeout {
        location: String,
        stage: String,
        timeout_ms: u64,
    },

    /// The selector was asked for zero colors
    #[error("Requested color count must be at least 1, got {requested}")]
    InvalidTopN { requested: usize },
}

/// Convenience type alias for Prism results.
pub type Result<T> = std::result::Result<T, PrismError>;

/// Convenience type alias for per-unit pipeline results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
