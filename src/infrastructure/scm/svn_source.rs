use super::source::{CheckoutState, RepositorySource, SourceError};
use crate::domain::value_objects::revision::Revision;
use crate::domain::value_objects::scm_type::ScmType;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Subversion implementation of the repository source, shelling out to
/// the `svn` executable. Revisions are decimal numbers; "next" is
/// current+1 when the remote HEAD has reached it.
pub struct SvnSource {
    uri: String,
    dest: PathBuf,
    svn_executable: String,
    state: CheckoutState,
}

impl SvnSource {
    pub fn new(uri: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            uri: uri.into(),
            dest: dest.into(),
            svn_executable: "svn".to_string(),
            state: CheckoutState::default(),
        }
    }

    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.svn_executable = executable.into();
        self
    }

    /// Execute an SVN command in the given directory
    async fn execute_svn_command(
        &self,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<std::process::Output, SourceError> {
        let mut cmd = Command::new(&self.svn_executable);
        cmd.args(args)
            .arg("--non-interactive")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::executable_not_found(&self.svn_executable)
            } else {
                SourceError::from(e)
            }
        })?;
        Ok(output)
    }

    /// Execute an SVN command and check for success
    async fn execute_svn_command_checked(
        &self,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<String, SourceError> {
        let output = self.execute_svn_command(args, working_dir).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let command = format!("{} {}", self.svn_executable, args.join(" "));
            return Err(SourceError::command_failed(
                command,
                output.status.code().unwrap_or(-1),
                stderr,
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Remote HEAD revision number.
    async fn remote_head(&self) -> Result<u64, SourceError> {
        let output = self
            .execute_svn_command_checked(
                &["info", "--show-item", "revision", self.uri.as_str()],
                None,
            )
            .await
            .map_err(|e| SourceError::poll_failed(format!("svn info failed: {}", e)))?;
        output
            .parse()
            .map_err(|_| SourceError::poll_failed(format!("unparsable head revision: {}", output)))
    }
}

/// current+1 when the remote has it, else none.
pub(crate) fn next_numeric(current: u64, head: u64) -> Option<u64> {
    if current < head {
        Some(current + 1)
    } else {
        None
    }
}

/// Author field of an `svn log` revision header line,
/// `r<N> | <author> | <date> | <lines>`.
pub(crate) fn parse_log_author(log_output: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^r\d+\s*\|\s*([^|]+?)\s*\|").ok()?;
    re.captures(log_output)
        .map(|caps| caps[1].trim().to_string())
}

#[async_trait]
impl RepositorySource for SvnSource {
    fn scm_type(&self) -> ScmType {
        ScmType::Svn
    }

    fn checkout_dir(&self) -> &Path {
        &self.dest
    }

    fn is_cloned(&self) -> bool {
        self.state.cloned
    }

    async fn ensure_clone(&mut self) -> Result<PathBuf, SourceError> {
        if !self.state.cloned {
            if self.dest.join(".svn").exists() {
                self.state.mark_cloned(self.dest.clone());
            } else {
                if let Some(parent) = self.dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let dest = self
                    .dest
                    .to_str()
                    .ok_or_else(|| {
                        SourceError::clone_failed("invalid destination path".to_string())
                    })?
                    .to_string();
                let uri = self.uri.clone();
                self.execute_svn_command_checked(&["checkout", uri.as_str(), dest.as_str()], None)
                    .await
                    .map_err(|e| {
                        SourceError::clone_failed(format!(
                            "svn checkout of {} failed: {}",
                            self.uri, e
                        ))
                    })?;
                self.state.mark_cloned(self.dest.clone());
            }
        }
        Ok(self.dest.clone())
    }

    async fn checkout(&mut self, revision: Option<&Revision>) -> Result<(), SourceError> {
        self.ensure_clone().await?;
        let mut args = vec!["update"];
        let number;
        if let Some(revision) = revision {
            number = revision
                .as_number()
                .ok_or_else(|| SourceError::non_numeric_revision(revision))?
                .to_string();
            args.push("--revision");
            args.push(&number);
        }
        let dest = self.dest.clone();
        self.execute_svn_command_checked(&args, Some(&dest))
            .await
            .map_err(|e| SourceError::checkout_failed(format!("svn update failed: {}", e)))?;
        Ok(())
    }

    async fn current_revision(&mut self) -> Result<Revision, SourceError> {
        if !self.state.cloned {
            return Err(SourceError::not_cloned(&self.dest));
        }
        let dest = self.dest.clone();
        let output = self
            .execute_svn_command_checked(&["info", "--show-item", "revision"], Some(&dest))
            .await?;
        Ok(Revision::new(output))
    }

    async fn clean(&mut self) -> Result<(), SourceError> {
        if !self.state.cloned {
            return Err(SourceError::not_cloned(&self.dest));
        }
        let dest = self.dest.clone();
        self.execute_svn_command_checked(&["revert", "--recursive", "."], Some(&dest))
            .await
            .map_err(|e| SourceError::clean_failed(format!("svn revert failed: {}", e)))?;
        Ok(())
    }

    async fn update_remote(&mut self) -> Result<(), SourceError> {
        // svn queries always hit the remote; nothing to refresh locally.
        Ok(())
    }

    async fn revision_after(
        &mut self,
        current: &Revision,
    ) -> Result<Option<Revision>, SourceError> {
        let number = current
            .as_number()
            .ok_or_else(|| SourceError::non_numeric_revision(current))?;
        let head = self.remote_head().await?;
        Ok(next_numeric(number, head).map(Revision::from))
    }

    async fn committer(&mut self, revision: Option<&Revision>) -> Result<String, SourceError> {
        let number = match revision {
            Some(revision) => revision
                .as_number()
                .ok_or_else(|| SourceError::non_numeric_revision(revision))?,
            None => self.remote_head().await?,
        };
        let number = number.to_string();
        let output = self
            .execute_svn_command_checked(&["log", "-r", number.as_str(), self.uri.as_str()], None)
            .await
            .map_err(|e| SourceError::poll_failed(format!("svn log failed: {}", e)))?;
        parse_log_author(&output).ok_or_else(|| {
            SourceError::poll_failed(format!("no author in svn log for r{}", number))
        })
    }
}
