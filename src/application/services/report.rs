use crate::domain::entities::smoke_result::{ReportArchive, SendOutcome};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while delivering a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid collector endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Report upload failed: {message}")]
    UploadFailed {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Report serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

impl ReportError {
    pub fn upload_failed(message: impl Into<String>) -> Self {
        Self::UploadFailed {
            message: message.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(error: reqwest::Error) -> Self {
        Self::UploadFailed {
            message: error.to_string(),
            source: Some(error),
        }
    }
}

/// Report-delivery collaborator.
///
/// The orchestrator branches only on the outcome's success flag; a
/// failed delivery is logged and never blocks revision persistence.
#[async_trait]
pub trait ReportSender: Send + Sync {
    async fn send(&self, archive: &ReportArchive) -> Result<SendOutcome, ReportError>;
}
