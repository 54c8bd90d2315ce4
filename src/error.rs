//! Crate-wide error type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("brightness must be a value between 0 and 1.0 (got {0})")]
    Brightness(f64),

    #[error("poll period must be at least 1 millisecond")]
    Period,

    #[error("unable to process {}: {source}", .path.display())]
    StatRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse {}: {reason}", .path.display())]
    StatParse { path: PathBuf, reason: String },

    #[error("no LED array found on {0}")]
    PeripheralAbsent(String),

    #[error("LED write failed: {0}")]
    Peripheral(#[from] io::Error),

    #[error("{0}")]
    Host(String),

    #[error("sampling task failed: {0}")]
    Task(String),
}

impl Error {
    pub fn convert_string(err: &str) -> Self {
        Error::Host(err.to_string())
    }

    /// Process exit code for a fatal error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Brightness(_) | Error::Period => 2,
            Error::PeripheralAbsent(_) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_separate_config_from_runtime_failures() {
        assert_eq!(Error::Brightness(1.5).exit_code(), 2);
        assert_eq!(Error::Period.exit_code(), 2);
        assert_eq!(Error::PeripheralAbsent("/dev/i2c-1".into()).exit_code(), 3);
        let read = Error::StatRead {
            path: "/proc/stat".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(read.exit_code(), 1);
    }

    #[test]
    fn brightness_message_names_the_value() {
        let msg = Error::Brightness(-0.5).to_string();
        assert!(msg.contains("between 0 and 1.0"));
        assert!(msg.contains("-0.5"));
    }
}
