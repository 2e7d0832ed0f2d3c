use std::path::PathBuf;
use thiserror::Error;

use crate::application::use_cases::checkout_project::CheckoutError;
use crate::application::use_cases::smoke_projects::SmokeError;
use crate::infrastructure::filesystem::config_store::ConfigStoreError;
use crate::infrastructure::scm::SourceError;

/// Top-level error type for the smoker.
///
/// Layer-specific errors (`SourceError`, `CheckoutError`, ...) are defined
/// next to the code that raises them; this enum is the boundary type the
/// library surface and the CLI report.
#[derive(Error, Debug)]
pub enum SmokerError {
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unknown project requested: {name}")]
    UnknownProject { name: String },

    #[error("Repository source error: {0}")]
    SourceError(#[from] SourceError),

    #[error("Checkout failed: {0}")]
    CheckoutError(#[from] CheckoutError),

    #[error("Smoke run failed: {0}")]
    SmokeError(#[from] SmokeError),

    #[error("File system operation failed: {message}")]
    FileSystemError {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Serialization error: {message}")]
    SerializationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SmokerError {
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn unknown_project(name: impl Into<String>) -> Self {
        Self::UnknownProject { name: name.into() }
    }

    pub fn filesystem_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn filesystem_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
            source: None,
        }
    }
}

impl From<ConfigStoreError> for SmokerError {
    fn from(error: ConfigStoreError) -> Self {
        Self::config_error_with_source("Project registry error", error)
    }
}

impl From<std::io::Error> for SmokerError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem_error_with_source("File system operation failed", None, error)
    }
}

impl From<serde_yaml::Error> for SmokerError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::SerializationError {
            message: "YAML serialization failed".to_string(),
            source: Some(Box::new(error)),
        }
    }
}

impl From<serde_json::Error> for SmokerError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError {
            message: "JSON serialization failed".to_string(),
            source: Some(Box::new(error)),
        }
    }
}
