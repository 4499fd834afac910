use thiserror::Error;

use crate::common::error::AppError::GenericError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Placement error: {0}")]
    PlacementError(#[from] riskplace_core::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<serde_json::error::Error> for AppError {
    fn from(e: serde_json::error::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Self::DeserializationError(e.to_string())
        } else {
            Self::SerializationError(e.to_string())
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(error: toml::de::Error) -> Self {
        Self::DeserializationError(error.to_string())
    }
}

impl From<humantime::DurationError> for AppError {
    fn from(error: humantime::DurationError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        GenericError(format!("Solver task failed: {error}"))
    }
}

impl From<String> for AppError {
    fn from(e: String) -> Self {
        GenericError(e)
    }
}
