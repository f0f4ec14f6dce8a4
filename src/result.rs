use std::path::PathBuf;

use thiserror::Error;

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to load configuration from {}: {message}", .path.display())]
    ConfigLoadError { path: PathBuf, message: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl AppError {
    /// Create a configuration load error
    pub fn config_load_error(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::ConfigLoadError { path, message: source.to_string() }
    }
}
