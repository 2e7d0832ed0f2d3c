use crate::domain::entities::project::ProjectRegistry;
use crate::domain::value_objects::revision::Revision;
use crate::infrastructure::harness::command_harness::LIB_PATHS_ENV;
use crate::infrastructure::process::command_executor::CommandExecutorError;
use crate::infrastructure::process::{CommandExecutor, ExecutionContext};
use crate::infrastructure::scm::{RepositorySource, SourceError};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;
use tracing::{debug, info};

/// Per-project repository sources, keyed by project name.
pub type SourceMap = HashMap<String, Box<dyn RepositorySource>>;

/// Checkout related errors
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Unknown project in dependency chain: {name}")]
    UnknownProject { name: String },

    #[error("Dependency cycle detected: {chain}")]
    DependencyCycle { chain: String },

    #[error("Dependency '{dependency}' of '{dependent}' failed: {source}")]
    DependencyFailed {
        dependency: String,
        dependent: String,
        #[source]
        source: Box<CheckoutError>,
    },

    #[error("Source operation failed for '{project}': {source}")]
    Source {
        project: String,
        #[source]
        source: SourceError,
    },

    #[error("Configure command failed for '{project}' (exit {exit_code}): {stderr}")]
    ConfigureFailed {
        project: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Clean hook failed for '{project}' (exit {exit_code}): {stderr}")]
    CleanHookFailed {
        project: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Command execution failed: {0}")]
    Executor(#[from] CommandExecutorError),
}

impl CheckoutError {
    /// Whether this attempt died in a dependency rather than in the
    /// requested project itself. The orchestrator's revision-advance
    /// policy branches on this.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, CheckoutError::DependencyFailed { .. })
    }
}

/// Result of a successful dependency-aware checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// Root directory of the requested project
    pub root: PathBuf,

    /// Own + transitive library paths, first-seen order, de-duplicated
    pub lib_paths: Vec<PathBuf>,

    /// (project, captured pre-test clean-hook output), in run order
    pub clean_states: Vec<(String, String)>,
}

/// Dependency-aware checkout of one project.
///
/// Checks out the requested project at an exact revision and each
/// declared dependency at its latest revision, depth first in
/// declaration order; pushes each project's environment frame; runs
/// configure commands with the merged library paths exposed. Any
/// dependency failure aborts the whole chain. Environment frames are
/// left pushed for the test phase; the orchestrator's cleaning step
/// unwinds them.
pub struct DependencyResolver<'a> {
    registry: &'a ProjectRegistry,
    sources: &'a mut SourceMap,
    executor: &'a CommandExecutor,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        registry: &'a ProjectRegistry,
        sources: &'a mut SourceMap,
        executor: &'a CommandExecutor,
    ) -> Self {
        Self {
            registry,
            sources,
            executor,
        }
    }

    /// Check out `name` (at `revision`; dependencies always at latest)
    /// together with its transitive dependencies.
    pub async fn checkout_project(
        &mut self,
        ctx: &mut ExecutionContext,
        name: &str,
        revision: Option<&Revision>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let mut chain = Vec::new();
        let mut clean_states = Vec::new();
        let lib_paths = self
            .checkout_recursive(ctx, name, revision, &mut chain, &mut clean_states)
            .await?;

        let project = self
            .registry
            .get(name)
            .ok_or_else(|| CheckoutError::UnknownProject {
                name: name.to_string(),
            })?;
        let checkout_dir = self
            .sources
            .get(name)
            .map(|s| s.checkout_dir().to_path_buf())
            .ok_or_else(|| CheckoutError::UnknownProject {
                name: name.to_string(),
            })?;

        Ok(CheckoutOutcome {
            root: project.project_root(&checkout_dir),
            lib_paths,
            clean_states,
        })
    }

    fn checkout_recursive<'b>(
        &'b mut self,
        ctx: &'b mut ExecutionContext,
        name: &'b str,
        revision: Option<&'b Revision>,
        chain: &'b mut Vec<String>,
        clean_states: &'b mut Vec<(String, String)>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>, CheckoutError>> + Send + 'b>> {
        Box::pin(async move {
            if chain.iter().any(|seen| seen == name) {
                let mut cycle = chain.clone();
                cycle.push(name.to_string());
                return Err(CheckoutError::DependencyCycle {
                    chain: cycle.join(" -> "),
                });
            }

            chain.push(name.to_string());
            let result = self
                .checkout_one(ctx, name, revision, chain, clean_states)
                .await;
            chain.pop();
            result
        })
    }

    async fn checkout_one(
        &mut self,
        ctx: &mut ExecutionContext,
        name: &str,
        revision: Option<&Revision>,
        chain: &mut Vec<String>,
        clean_states: &mut Vec<(String, String)>,
    ) -> Result<Vec<PathBuf>, CheckoutError> {
        let project = self
            .registry
            .get(name)
            .ok_or_else(|| CheckoutError::UnknownProject {
                name: name.to_string(),
            })?
            .clone();

        let source = self
            .sources
            .get_mut(name)
            .ok_or_else(|| CheckoutError::UnknownProject {
                name: name.to_string(),
            })?;

        let source_err = |source| CheckoutError::Source {
            project: name.to_string(),
            source,
        };

        // Working copy: clone once, then move it to the target revision
        // (exact for the requested project, latest for dependencies).
        let checkout_dir = source.ensure_clone().await.map_err(source_err)?;
        source.checkout(revision).await.map_err(|source| {
            CheckoutError::Source {
                project: name.to_string(),
                source,
            }
        })?;

        let root = project.project_root(&checkout_dir);
        let mut lib_paths = project.own_lib_paths(&checkout_dir);

        // Environment frame for this project: declared vars plus the
        // synthesized checkout-root variable. Stays pushed until the
        // orchestrator's cleaning step unwinds the whole stack.
        let mut vars = project.env.clone();
        vars.insert(project.root_env_name(), root.display().to_string());
        ctx.env_mut().push(&vars);

        debug!(project = name, root = %root.display(), "checked out");

        for dependency in &project.dependencies {
            let dep_paths = self
                .checkout_recursive(ctx, dependency, None, chain, clean_states)
                .await
                .map_err(|e| CheckoutError::DependencyFailed {
                    dependency: dependency.clone(),
                    dependent: name.to_string(),
                    source: Box::new(e),
                })?;
            lib_paths.extend(dep_paths);
        }

        let lib_paths = dedup_paths(lib_paths);

        if let Some(configure_cmd) = &project.configure_cmd {
            ctx.set_cwd(root.clone());
            info!(project = name, cmd = %configure_cmd, "configuring");
            let extra = vec![(LIB_PATHS_ENV.to_string(), join_paths(&lib_paths))];
            let result = self
                .executor
                .run_shell_with_env(configure_cmd, &root, ctx, &extra, None)
                .await?;
            if !result.success {
                return Err(CheckoutError::ConfigureFailed {
                    project: name.to_string(),
                    exit_code: result.exit_code,
                    stderr: result.stderr,
                });
            }
        }

        // Pre-test clean hook: capture the state text the post-test run
        // is fed later.
        if let Some(clean_cmd) = &project.clean_cmd {
            let result = self.executor.run_shell(clean_cmd, &root, ctx, None).await?;
            if !result.success {
                return Err(CheckoutError::CleanHookFailed {
                    project: name.to_string(),
                    exit_code: result.exit_code,
                    stderr: result.stderr,
                });
            }
            clean_states.push((name.to_string(), result.stdout));
        }

        Ok(lib_paths)
    }
}

fn dedup_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = Vec::new();
    for path in paths {
        if !seen.contains(&path) {
            seen.push(path);
        }
    }
    seen
}

/// Join library paths for the `CHIMPS_LIB_PATHS` contract.
pub fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(":")
}
