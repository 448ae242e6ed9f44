//! Error types for spidev operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a spidev handle or one of its backends
#[derive(Debug, Error)]
pub enum Error {
    /// The handle has no open device
    #[error("Device is not open")]
    NotOpen,

    /// Failed to open the character device
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bus and/or device number do not form a usable device
    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    /// A transfer or write was given no data
    #[error("Empty argument list.")]
    EmptyData,

    /// Data is longer than a single-shot operation accepts
    #[error("Argument list size exceeds {max} bytes (got {len}).")]
    TooLong { len: usize, max: usize },

    /// Requested SPI mode is outside 0..=3
    #[error("The mode attribute must be an integer between 0 and 3 (got {0})")]
    InvalidMode(u8),

    /// Requested word size is outside 8..=32
    #[error("invalid bits_per_word {0} (8 to 32)")]
    InvalidBitsPerWord(u8),

    /// The controller did not accept the mode that was written
    #[error("SPI mode not accepted: wrote {requested:#04x}, read back {actual:#04x}")]
    ModeMismatch { requested: u8, actual: u8 },

    /// `read` returned fewer bytes than requested
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// `write` accepted fewer bytes than supplied
    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },

    /// A system call on the device failed
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an errno returned by the kernel for the named operation
    pub fn os(op: &'static str, errno: i32) -> Self {
        Error::Io {
            op,
            source: std::io::Error::from_raw_os_error(errno),
        }
    }

    /// The kernel errno behind this error, if there is one
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Open { source, .. } | Error::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Result type for spidev operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_os_error() {
        let err = Error::os("SPI_IOC_WR_MODE", 22);
        assert_eq!(err.raw_os_error(), Some(22));
        assert!(err.to_string().starts_with("SPI_IOC_WR_MODE failed"));

        assert_eq!(Error::EmptyData.raw_os_error(), None);
    }

    #[test]
    fn test_messages() {
        assert_eq!(Error::EmptyData.to_string(), "Empty argument list.");
        let err = Error::TooLong {
            len: 4097,
            max: 4096,
        };
        assert_eq!(
            err.to_string(),
            "Argument list size exceeds 4096 bytes (got 4097)."
        );
    }
}
