//! Mock services for testing
//!
//! Hand-rolled mock implementations of the orchestrator's collaborator
//! seams, with call histories for verification.

use async_trait::async_trait;
use chimps_smoker::application::services::harness::{HarnessError, HarnessRequest, TestHarness};
use chimps_smoker::application::services::report::{ReportError, ReportSender};
use chimps_smoker::domain::entities::smoke_result::{ReportArchive, SendOutcome, SmokeMeta};
use chimps_smoker::infrastructure::process::ExecutionContext;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// One recorded harness invocation.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub project: String,
    pub revision: String,
    pub root: PathBuf,
    pub test_glob: String,
    pub lib_paths: Vec<PathBuf>,
    /// Value of the project's root env var at harness time, if set
    pub root_env: Option<String>,
}

/// Harness mock recording every run; optionally scripted to fail.
pub struct RecordingHarness {
    calls: Arc<Mutex<Vec<RecordedRun>>>,
    fail: bool,
}

impl RecordingHarness {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<RecordedRun>>> {
        Arc::clone(&self.calls)
    }
}

impl Default for RecordingHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestHarness for RecordingHarness {
    async fn run(
        &self,
        request: &HarnessRequest,
        ctx: &ExecutionContext,
    ) -> Result<ReportArchive, HarnessError> {
        let env_name = format!(
            "CHIMPS_{}_ROOT",
            request.meta.project.to_uppercase().replace('-', "_")
        );
        self.calls.lock().unwrap().push(RecordedRun {
            project: request.meta.project.clone(),
            revision: request.meta.revision.to_string(),
            root: request.root.clone(),
            test_glob: request.test_glob.clone(),
            lib_paths: request.lib_paths.clone(),
            root_env: ctx.env().get(&env_name).map(String::from),
        });

        if self.fail {
            return Err(HarnessError::InvalidGlob {
                glob: request.test_glob.clone(),
                message: "scripted harness failure".to_string(),
            });
        }

        Ok(ReportArchive::new(
            request.meta.clone(),
            b"mock harness output".to_vec(),
            Some(0),
        ))
    }
}

/// Sender mock recording every delivered archive.
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<SmokeMeta>>>,
    accept: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            accept: true,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            accept: false,
        }
    }

    pub fn sent(&self) -> Arc<Mutex<Vec<SmokeMeta>>> {
        Arc::clone(&self.sent)
    }
}

impl Default for RecordingSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportSender for RecordingSender {
    async fn send(&self, archive: &ReportArchive) -> Result<SendOutcome, ReportError> {
        self.sent.lock().unwrap().push(archive.meta.clone());
        if self.accept {
            Ok(SendOutcome::success("accepted"))
        } else {
            Ok(SendOutcome::failure("scripted rejection"))
        }
    }
}
