//! Error types for the rover link

use crate::commands::CommandError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Rover link error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// Robot never answered the start-streaming command
    #[error("No response from robot after {attempts} start attempts")]
    NoResponse {
        /// Number of start commands sent
        attempts: u32,
    },

    /// Operator command rejected before transmission
    #[error("Command rejected: {0}")]
    Command(#[from] CommandError),

    /// Reader thread panicked
    #[error("Reader thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
