use crate::domain::value_objects::revision::Revision;
use crate::domain::value_objects::scm_type::ScmType;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Ephemeral working-directory state, 1:1 with a repository source.
#[derive(Debug, Clone, Default)]
pub struct CheckoutState {
    /// Whether the working copy has been created
    pub cloned: bool,

    /// Checkout directory once it exists
    pub directory: Option<PathBuf>,
}

impl CheckoutState {
    pub fn mark_cloned(&mut self, directory: impl Into<PathBuf>) {
        self.cloned = true;
        self.directory = Some(directory.into());
    }
}

/// Capability interface over the closed set of repository kinds.
///
/// One instance per project; each instance clones at most once per
/// orchestrator lifetime and later revisions reuse the same checkout
/// directory. Implementations receive only their project's repository
/// slice (URI + destination), never the orchestrator's configuration.
#[async_trait]
pub trait RepositorySource: Send {
    /// The SCM kind this source handles
    fn scm_type(&self) -> ScmType;

    /// Destination directory for the working copy
    fn checkout_dir(&self) -> &Path;

    /// Whether the working copy exists yet
    fn is_cloned(&self) -> bool;

    /// Create the working copy if it does not exist yet. Idempotent;
    /// returns the checkout directory.
    async fn ensure_clone(&mut self) -> Result<PathBuf, SourceError>;

    /// Move the working copy to `revision`, or to the latest remote
    /// revision when `None` (used for dependencies).
    async fn checkout(&mut self, revision: Option<&Revision>) -> Result<(), SourceError>;

    /// Revert build droppings so the next checkout starts clean.
    async fn clean(&mut self) -> Result<(), SourceError>;

    /// Revision the working copy currently sits at.
    async fn current_revision(&mut self) -> Result<Revision, SourceError>;

    /// Refresh remote-tracking state. May be a no-op for SCMs whose
    /// queries always hit the remote.
    async fn update_remote(&mut self) -> Result<(), SourceError>;

    /// The revision immediately following `current` in the remote
    /// history, or `None` when `current` is the newest known.
    async fn revision_after(&mut self, current: &Revision)
        -> Result<Option<Revision>, SourceError>;

    /// Author of `revision`, or of the remote tip when `None`.
    async fn committer(&mut self, revision: Option<&Revision>) -> Result<String, SourceError>;

    /// Poll for the next unsmoked revision: try `revision_after`; when
    /// empty, refresh the remote and retry once.
    async fn next(
        &mut self,
        current: &Revision,
    ) -> Result<Option<(Revision, String)>, SourceError> {
        let found = match self.revision_after(current).await? {
            Some(revision) => Some(revision),
            None => {
                self.update_remote().await?;
                self.revision_after(current).await?
            }
        };

        match found {
            Some(revision) => {
                let committer = self.committer(Some(&revision)).await?;
                Ok(Some((revision, committer)))
            }
            None => Ok(None),
        }
    }
}

/// Errors raised by repository sources
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Clone operation failed: {message}")]
    CloneFailed { message: String },

    #[error("Checkout operation failed: {message}")]
    CheckoutFailed { message: String },

    #[error("Clean operation failed: {message}")]
    CleanFailed { message: String },

    #[error("Poll operation failed: {message}")]
    PollFailed { message: String },

    #[error("Working copy not cloned yet at {path}")]
    NotCloned { path: String },

    #[error("Unknown revision: {revision}")]
    UnknownRevision { revision: String },

    #[error("Revision '{revision}' is not numeric")]
    NonNumericRevision { revision: String },

    #[error("SCM executable not found: {executable}")]
    ExecutableNotFound { executable: String },

    #[error("Command execution failed: {command}, exit code: {exit_code}, stderr: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Git operation failed: {message}")]
    GitError {
        message: String,
        #[source]
        source: Option<git2::Error>,
    },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn clone_failed(message: impl Into<String>) -> Self {
        Self::CloneFailed {
            message: message.into(),
        }
    }

    pub fn checkout_failed(message: impl Into<String>) -> Self {
        Self::CheckoutFailed {
            message: message.into(),
        }
    }

    pub fn clean_failed(message: impl Into<String>) -> Self {
        Self::CleanFailed {
            message: message.into(),
        }
    }

    pub fn poll_failed(message: impl Into<String>) -> Self {
        Self::PollFailed {
            message: message.into(),
        }
    }

    pub fn not_cloned(path: &Path) -> Self {
        Self::NotCloned {
            path: path.display().to_string(),
        }
    }

    pub fn unknown_revision(revision: &Revision) -> Self {
        Self::UnknownRevision {
            revision: revision.to_string(),
        }
    }

    pub fn non_numeric_revision(revision: &Revision) -> Self {
        Self::NonNumericRevision {
            revision: revision.to_string(),
        }
    }

    pub fn executable_not_found(executable: impl Into<String>) -> Self {
        Self::ExecutableNotFound {
            executable: executable.into(),
        }
    }

    pub fn command_failed(
        command: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn git_error(message: impl Into<String>) -> Self {
        Self::GitError {
            message: message.into(),
            source: None,
        }
    }
}

impl From<git2::Error> for SourceError {
    fn from(error: git2::Error) -> Self {
        Self::GitError {
            message: error.message().to_string(),
            source: Some(error),
        }
    }
}
