use super::execution_context::ExecutionContext;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Command executor errors
#[derive(Debug, Error)]
pub enum CommandExecutorError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Process spawn failed for '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result of one child-process invocation.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Exit code of the process (-1 when terminated by a signal)
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Whether the command exited zero
    pub success: bool,
}

/// Runs configure/clean commands as blocking child processes.
///
/// Commands are shell strings from the registry, executed through
/// `sh -c` in a given directory with the execution context's effective
/// environment (`env_clear` + baseline + overlay). No timeout is
/// enforced here; a hung child blocks the poller by design.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    shell: String,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a shell command in `dir`, optionally feeding `stdin_text`.
    pub async fn run_shell(
        &self,
        command: &str,
        dir: &Path,
        ctx: &ExecutionContext,
        stdin_text: Option<&str>,
    ) -> Result<ExecutionResult, CommandExecutorError> {
        self.run_shell_with_env(command, dir, ctx, &[], stdin_text)
            .await
    }

    /// Like [`CommandExecutor::run_shell`], with per-invocation extra
    /// environment variables layered over the context's effective
    /// environment.
    pub async fn run_shell_with_env(
        &self,
        command: &str,
        dir: &Path,
        ctx: &ExecutionContext,
        extra_env: &[(String, String)],
        stdin_text: Option<&str>,
    ) -> Result<ExecutionResult, CommandExecutorError> {
        if command.trim().is_empty() {
            return Err(CommandExecutorError::InvalidCommand(command.to_string()));
        }

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(dir)
            .env_clear()
            .envs(ctx.effective_env())
            .envs(extra_env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd.stdin(if stdin_text.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|e| CommandExecutorError::SpawnFailed {
            command: command.to_string(),
            source: e,
        })?;

        if let Some(text) = stdin_text {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.as_bytes()).await?;
                // Dropping stdin closes the pipe so the child sees EOF.
            }
        }

        let output = child.wait_with_output().await?;
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(ExecutionResult {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}
