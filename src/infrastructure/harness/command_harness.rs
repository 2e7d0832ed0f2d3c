use crate::application::services::harness::{HarnessError, HarnessRequest, TestHarness};
use crate::domain::entities::smoke_result::ReportArchive;
use crate::infrastructure::process::ExecutionContext;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable carrying the merged library paths into the test
/// runner and the configure command.
pub const LIB_PATHS_ENV: &str = "CHIMPS_LIB_PATHS";

/// Child-process test harness: expands the project's test glob and runs
/// a configurable runner command (`prove` by default) over the matched
/// files, capturing combined output into the report archive.
///
/// The runner's exit status is recorded in the archive but never
/// interpreted here; failing tests are report content, not errors.
pub struct CommandHarness {
    runner: String,
}

impl Default for CommandHarness {
    fn default() -> Self {
        Self {
            runner: "prove".to_string(),
        }
    }
}

impl CommandHarness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runner(runner: impl Into<String>) -> Self {
        Self {
            runner: runner.into(),
        }
    }
}

/// Expand whitespace-separated glob patterns relative to `root`,
/// sorted, first-seen de-duplicated.
pub fn expand_test_globs(root: &Path, patterns: &str) -> Result<Vec<PathBuf>, HarnessError> {
    let mut files = Vec::new();
    for pattern in patterns.split_whitespace() {
        let absolute = root.join(pattern);
        let pattern_str = absolute.to_string_lossy().into_owned();
        let entries = glob::glob(&pattern_str).map_err(|e| HarnessError::InvalidGlob {
            glob: pattern.to_string(),
            message: e.to_string(),
        })?;
        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| HarnessError::InvalidGlob {
                glob: pattern.to_string(),
                message: e.to_string(),
            })?;
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            matched.push(relative);
        }
        matched.sort();
        for path in matched {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn join_lib_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

#[async_trait]
impl TestHarness for CommandHarness {
    async fn run(
        &self,
        request: &HarnessRequest,
        ctx: &ExecutionContext,
    ) -> Result<ReportArchive, HarnessError> {
        let files = expand_test_globs(&request.root, &request.test_glob)?;

        if files.is_empty() {
            warn!(
                project = %request.meta.project,
                glob = %request.test_glob,
                "no test files matched"
            );
            let body = format!("no test files matched glob '{}'\n", request.test_glob);
            return Ok(ReportArchive::new(
                request.meta.clone(),
                body.into_bytes(),
                None,
            ));
        }

        debug!(
            project = %request.meta.project,
            files = files.len(),
            runner = %self.runner,
            "running test harness"
        );

        let mut cmd = Command::new(&self.runner);
        if let Some(jobs) = request.jobs {
            cmd.arg(format!("--jobs={}", jobs));
        }
        for path in &request.lib_paths {
            cmd.arg("-I").arg(path);
        }
        cmd.args(&files)
            .current_dir(&request.root)
            .env_clear()
            .envs(ctx.effective_env())
            .env(LIB_PATHS_ENV, join_lib_paths(&request.lib_paths))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output().await.map_err(|e| HarnessError::RunnerFailed {
            runner: self.runner.clone(),
            source: e,
        })?;

        let mut body = Vec::new();
        body.extend_from_slice(&output.stdout);
        if !output.stderr.is_empty() {
            body.extend_from_slice(b"\n--- stderr ---\n");
            body.extend_from_slice(&output.stderr);
        }

        Ok(ReportArchive::new(
            request.meta.clone(),
            body,
            output.status.code(),
        ))
    }
}
