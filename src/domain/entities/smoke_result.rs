use crate::domain::value_objects::revision::Revision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to every smoke report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeMeta {
    /// Project name
    pub project: String,

    /// Revision under test
    pub revision: Revision,

    /// Author of the revision
    pub committer: String,

    /// Operating system name (e.g. `linux`)
    pub os_name: String,

    /// Kernel/OS release string, best effort
    pub os_version: String,

    /// CPU architecture (e.g. `x86_64`)
    pub arch: String,

    /// When the attempt started
    pub started_at: DateTime<Utc>,
}

impl SmokeMeta {
    /// Metadata for an attempt starting now on this host.
    pub fn for_attempt(
        project: impl Into<String>,
        revision: Revision,
        committer: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            revision,
            committer: committer.into(),
            os_name: std::env::consts::OS.to_string(),
            os_version: os_release(),
            arch: std::env::consts::ARCH.to_string(),
            started_at: Utc::now(),
        }
    }
}

fn os_release() -> String {
    std::process::Command::new("uname")
        .arg("-r")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Opaque report bundle produced by the test harness.
///
/// The orchestrator never interprets the body or the runner's exit
/// status; it only forwards the archive to the report sender.
#[derive(Debug, Clone)]
pub struct ReportArchive {
    /// Attempt metadata
    pub meta: SmokeMeta,

    /// Captured harness output
    pub body: Vec<u8>,

    /// Exit status of the test runner, recorded but not interpreted
    pub runner_status: Option<i32>,
}

impl ReportArchive {
    pub fn new(meta: SmokeMeta, body: Vec<u8>, runner_status: Option<i32>) -> Self {
        Self {
            meta,
            body,
            runner_status,
        }
    }
}

/// Collector response for a report upload.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub success: bool,
    pub message: String,
}

impl SendOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Terminal state of one project in one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectState {
    /// Skipped: only ever smoked as a dependency
    DependencyOnly,
    /// Poll returned nothing new
    NoChange,
    /// Checkout/configure failed; revision persisted
    BuildFailed { revision: Revision },
    /// Dependency chain failed before the project's own configure
    DependencyFailed { dependency: String },
    /// Tested and reported
    Reported { revision: Revision, sent: bool },
    /// Tested, no sender configured or send skipped
    Done { revision: Revision },
    /// Unexpected error caught at the loop boundary
    Errored { message: String },
}

/// Accumulated outcome of a smoke run.
#[derive(Debug, Clone, Default)]
pub struct SmokeSummary {
    /// Iterations actually driven
    pub iterations: u64,

    /// (project, final state) per attempt, in execution order
    pub attempts: Vec<(String, ProjectState)>,

    /// Errors caught at the loop boundary
    pub errors: Vec<String>,
}

impl SmokeSummary {
    pub fn record(&mut self, project: &str, state: ProjectState) {
        if let ProjectState::Errored { message } = &state {
            self.errors.push(format!("{}: {}", project, message));
        }
        self.attempts.push((project.to_string(), state));
    }

    pub fn tested_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|(_, s)| matches!(s, ProjectState::Reported { .. } | ProjectState::Done { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|(_, s)| {
                matches!(
                    s,
                    ProjectState::BuildFailed { .. }
                        | ProjectState::DependencyFailed { .. }
                        | ProjectState::Errored { .. }
                )
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_for_attempt() {
        let meta = SmokeMeta::for_attempt("widget", Revision::from("abc"), "alice");
        assert_eq!(meta.project, "widget");
        assert_eq!(meta.committer, "alice");
        assert_eq!(meta.os_name, std::env::consts::OS);
        assert_eq!(meta.arch, std::env::consts::ARCH);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = SmokeSummary::default();
        summary.record("a", ProjectState::NoChange);
        summary.record(
            "b",
            ProjectState::Reported {
                revision: Revision::from("r2"),
                sent: true,
            },
        );
        summary.record(
            "c",
            ProjectState::BuildFailed {
                revision: Revision::from("r3"),
            },
        );
        summary.record(
            "d",
            ProjectState::Errored {
                message: "boom".to_string(),
            },
        );

        assert_eq!(summary.tested_count(), 1);
        assert_eq!(summary.failed_count(), 2);
        assert_eq!(summary.errors, vec!["d: boom".to_string()]);
    }
}
