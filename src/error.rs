//! # Error Types
//!
//! Custom error types for Gesture Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Gesture Bridge
#[derive(Debug, Error)]
pub enum GestureBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial link errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No usable serial device found among the candidate paths
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Detector event feed errors
    #[error("Detector feed error: {0}")]
    Feed(String),

    /// Gesture mapping table errors
    #[error("Gesture mapping error: {0}")]
    Mapping(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Gesture Bridge
pub type Result<T> = std::result::Result<T, GestureBridgeError>;
