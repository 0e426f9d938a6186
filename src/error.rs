//! Error types for MaidanLoc.

use thiserror::Error;

/// MaidanLoc error type.
#[derive(Error, Debug)]
pub enum LocError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Field model cache error: {0}")]
    Cache(String),
}

impl From<toml::de::Error> for LocError {
    fn from(e: toml::de::Error) -> Self {
        LocError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LocError>;
