//! Error types for the logz_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for logz_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred (opening a log file, reading a config file)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Console output selector not recognised
    #[error("Invalid console output: {0} (expected auto, stdout or stderr)")]
    InvalidOutput(String),

    /// Severity name not recognised by strict parsing
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    /// The process-wide registry was installed twice
    #[error("Global registry already initialized")]
    AlreadyInitialized,
}
