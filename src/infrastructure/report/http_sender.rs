use crate::application::services::report::{ReportError, ReportSender};
use crate::domain::entities::smoke_result::{ReportArchive, SendOutcome};
use async_trait::async_trait;
use url::Url;
use tracing::{debug, info};

/// HTTP report sender: multipart POST of the attempt metadata and the
/// archive body to the collector endpoint.
pub struct HttpReportSender {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpReportSender {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_str(endpoint: &str) -> Result<Self, ReportError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ReportError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        Ok(Self::new(url))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ReportSender for HttpReportSender {
    async fn send(&self, archive: &ReportArchive) -> Result<SendOutcome, ReportError> {
        let meta_json = serde_json::to_string(&archive.meta)?;

        let form = reqwest::multipart::Form::new()
            .text("project", archive.meta.project.clone())
            .text("revision", archive.meta.revision.to_string())
            .text("committer", archive.meta.committer.clone())
            .text("meta", meta_json)
            .part(
                "report",
                reqwest::multipart::Part::bytes(archive.body.clone())
                    .file_name("report.txt")
                    .mime_str("text/plain")
                    .map_err(|e| ReportError::upload_failed(e.to_string()))?,
            );

        debug!(
            project = %archive.meta.project,
            endpoint = %self.endpoint,
            "uploading smoke report"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            Ok(SendOutcome::success(body))
        } else {
            Ok(SendOutcome::failure(format!(
                "collector returned {}: {}",
                status, body
            )))
        }
    }
}

/// Sender used when no collector is configured: logs the metadata and
/// reports success so revision persistence proceeds normally.
#[derive(Debug, Default)]
pub struct NullReportSender;

impl NullReportSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportSender for NullReportSender {
    async fn send(&self, archive: &ReportArchive) -> Result<SendOutcome, ReportError> {
        info!(
            project = %archive.meta.project,
            revision = %archive.meta.revision,
            bytes = archive.body.len(),
            "no collector configured, discarding report"
        );
        Ok(SendOutcome::success("no collector configured"))
    }
}
