//! Error types for spidev configuration strings

use thiserror::Error;

/// Errors from parsing a device specification or option list
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No device given
    #[error("No device specified. Use dev=/dev/spidevX.Y or dev=X.Y")]
    NoDevice,

    /// Device is neither a path nor `bus.device`
    #[error("Invalid device: {0} (expected /dev/spidevX.Y or X.Y)")]
    InvalidDevice(String),

    /// Option value could not be parsed
    #[error("Invalid {key} value: {value}")]
    InvalidValue { key: String, value: String },

    /// Option is not `key=value`
    #[error("Malformed option: {0}")]
    Malformed(String),
}

/// Result type for configuration parsing
pub type Result<T> = std::result::Result<T, ConfigError>;
