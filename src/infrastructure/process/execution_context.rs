use super::env_stack::EnvironmentStack;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Explicit execution context threaded through the resolver and the
/// orchestrator: a current directory plus an environment overlay.
///
/// Checkout and build steps mutate this context instead of the
/// process-global working directory and environment, which keeps one
/// orchestrator's state observable and lets tests inject a fake baseline.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    cwd: PathBuf,
    env: EnvironmentStack,
}

impl ExecutionContext {
    /// Context rooted at `cwd` with the calling process environment as
    /// the baseline.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            env: EnvironmentStack::from_process_env(),
        }
    }

    /// Context with an injected baseline, for tests.
    pub fn with_baseline(cwd: impl Into<PathBuf>, baseline: HashMap<String, String>) -> Self {
        Self {
            cwd: cwd.into(),
            env: EnvironmentStack::new(baseline),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn set_cwd(&mut self, dir: impl Into<PathBuf>) {
        self.cwd = dir.into();
    }

    pub fn env(&self) -> &EnvironmentStack {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut EnvironmentStack {
        &mut self.env
    }

    /// Environment a child process spawned in this context receives.
    pub fn effective_env(&self) -> HashMap<String, String> {
        self.env.effective()
    }
}
