//! Error types for the CIFAR-10 training workspace.

use thiserror::Error;

/// Main error type for the training workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset error
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training error
    #[error("Training error: {0}")]
    Training(String),

    /// Checkpoint error
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Specialized Result type for training operations.
pub type Result<T> = std::result::Result<T, Error>;
