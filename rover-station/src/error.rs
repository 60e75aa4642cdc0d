//! Error types for the ground station

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Ground station error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Radio link failure
    #[error("Link error: {0}")]
    Link(#[from] rover_link::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// Map image could not be written
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

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
