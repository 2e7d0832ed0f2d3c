use crate::domain::entities::smoke_result::{ReportArchive, SmokeMeta};
use crate::infrastructure::process::ExecutionContext;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Everything the harness needs to run one project's test suite.
#[derive(Debug, Clone)]
pub struct HarnessRequest {
    /// Project root inside the checkout
    pub root: PathBuf,

    /// Whitespace-separated test-file globs, relative to `root`
    pub test_glob: String,

    /// Merged library paths (own + transitive dependencies)
    pub lib_paths: Vec<PathBuf>,

    /// Parallel test jobs, when the project declares them
    pub jobs: Option<u32>,

    /// Attempt metadata bundled into the report
    pub meta: SmokeMeta,
}

/// Errors raised when the harness cannot run at all.
///
/// Failing tests are not an error; they are recorded inside the archive.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Invalid test glob '{glob}': {message}")]
    InvalidGlob { glob: String, message: String },

    #[error("Test runner '{runner}' could not be started: {source}")]
    RunnerFailed {
        runner: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Test-execution collaborator.
///
/// Given a checked-out tree it produces an opaque report archive; the
/// orchestrator interprets only whether the harness ran, never the test
/// outcomes inside the archive.
#[async_trait]
pub trait TestHarness: Send + Sync {
    async fn run(
        &self,
        request: &HarnessRequest,
        ctx: &ExecutionContext,
    ) -> Result<ReportArchive, HarnessError>;
}
