use crate::application::services::harness::{HarnessRequest, TestHarness};
use crate::application::services::report::ReportSender;
use crate::application::use_cases::checkout_project::{
    CheckoutError, DependencyResolver, SourceMap,
};
use crate::common::error::SmokerError;
use crate::common::result::SmokerResult;
use crate::domain::entities::project::ProjectRegistry;
use crate::domain::entities::smoke_result::{ProjectState, SmokeMeta, SmokeSummary};
use crate::domain::value_objects::revision::Revision;
use crate::infrastructure::filesystem::config_store::{ConfigStore, ConfigStoreError};
use crate::infrastructure::harness::CommandHarness;
use crate::infrastructure::process::{CommandExecutor, ExecutionContext};
use crate::infrastructure::report::NullReportSender;
use crate::infrastructure::scm::{SourceError, SourceFactory};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that abort one project's attempt (caught at the loop boundary).
#[derive(Debug, Error)]
pub enum SmokeError {
    #[error("Source operation failed: {0}")]
    Source(#[from] SourceError),

    #[error("Revision persistence failed: {0}")]
    Persist(#[from] ConfigStoreError),

    #[error("Project missing from registry: {0}")]
    MissingProject(String),
}

/// Smoke run settings.
#[derive(Debug, Clone, Default)]
pub struct SmokeConfig {
    /// Checkout workspace; a scratch directory removed on shutdown when
    /// not pinned
    pub workdir: Option<PathBuf>,

    /// Pause between iterations
    pub sleep: Option<Duration>,

    /// Whether a dependent's revision still advances when one of its
    /// dependencies (not the project itself) broke the attempt
    pub advance_on_dependency_failure: bool,
}

impl SmokeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn with_sleep(mut self, sleep: Duration) -> Self {
        self.sleep = Some(sleep);
        self
    }

    pub fn with_advance_on_dependency_failure(mut self, advance: bool) -> Self {
        self.advance_on_dependency_failure = advance;
        self
    }
}

enum Workspace {
    /// Removed when the orchestrator is dropped
    Scratch(tempfile::TempDir),
    /// Operator-pinned directory, left in place
    Pinned(PathBuf),
}

impl Workspace {
    fn path(&self) -> &Path {
        match self {
            Workspace::Scratch(dir) => dir.path(),
            Workspace::Pinned(path) => path,
        }
    }
}

/// Drives the per-project state machine across polling iterations:
/// `IDLE -> CLONING -> POLLING -> {NO_CHANGE | CHECKING_OUT} ->
/// {BUILD_FAILED | TESTING} -> CLEANING -> {REPORTING | DONE}`.
///
/// Projects are processed strictly sequentially; checkout and build
/// share one execution context. An error in one project is caught at
/// the loop boundary and never aborts siblings or the loop.
pub struct SmokeOrchestrator {
    store: ConfigStore,
    registry: ProjectRegistry,
    sources: SourceMap,
    revisions: HashMap<String, Revision>,
    ctx: ExecutionContext,
    executor: CommandExecutor,
    harness: Box<dyn TestHarness>,
    sender: Box<dyn ReportSender>,
    config: SmokeConfig,
    shutdown: Arc<AtomicBool>,
    workspace: Workspace,
}

impl SmokeOrchestrator {
    /// Build an orchestrator over a loaded registry. Sources are
    /// created eagerly (one per project, sharing nothing), checkouts
    /// happen lazily on first attempt.
    pub fn new(
        store: ConfigStore,
        registry: ProjectRegistry,
        config: SmokeConfig,
    ) -> SmokerResult<Self> {
        let workspace = match &config.workdir {
            Some(path) => {
                std::fs::create_dir_all(path)?;
                Workspace::Pinned(path.clone())
            }
            None => Workspace::Scratch(
                tempfile::Builder::new()
                    .prefix("chimps-smoker")
                    .tempdir()?,
            ),
        };

        let mut sources = SourceMap::new();
        let mut revisions = HashMap::new();
        for (name, project) in registry.iter() {
            let dest = workspace.path().join(name);
            sources.insert(
                name.clone(),
                SourceFactory::create(&project.repository, dest),
            );
            if let Some(revision) = &project.revision {
                revisions.insert(name.clone(), revision.clone());
            }
        }

        let ctx = ExecutionContext::new(workspace.path());

        Ok(Self {
            store,
            registry,
            sources,
            revisions,
            ctx,
            executor: CommandExecutor::new(),
            harness: Box::new(CommandHarness::new()),
            sender: Box::new(NullReportSender::new()),
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            workspace,
        })
    }

    pub fn with_harness(mut self, harness: Box<dyn TestHarness>) -> Self {
        self.harness = harness;
        self
    }

    pub fn with_sender(mut self, sender: Box<dyn ReportSender>) -> Self {
        self.sender = sender;
        self
    }

    /// Flag a signal handler can set to stop the loop between projects.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Directory checkouts live under for this orchestrator's lifetime.
    pub fn workdir(&self) -> &Path {
        self.workspace.path()
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run the smoke loop for `iterations` rounds (unbounded when
    /// `None`) over `projects` (every non-dependency-only project when
    /// `None`).
    pub async fn smoke(
        &mut self,
        iterations: Option<u64>,
        projects: Option<&[String]>,
    ) -> SmokerResult<SmokeSummary> {
        let selection = self.select_projects(projects)?;
        let mut summary = SmokeSummary::default();

        let mut iteration: u64 = 0;
        loop {
            if let Some(limit) = iterations {
                if iteration >= limit {
                    break;
                }
            }
            if self.is_shutting_down() {
                info!("shutdown requested, stopping smoke loop");
                break;
            }

            info!(iteration, "starting smoke iteration");
            for name in &selection {
                if self.is_shutting_down() {
                    break;
                }
                let state = match self.smoke_one(name).await {
                    Ok(state) => state,
                    Err(e) => {
                        // Failure isolation: one broken project never
                        // takes down its siblings or the loop.
                        error!(project = %name, error = %e, "project attempt failed");
                        ProjectState::Errored {
                            message: e.to_string(),
                        }
                    }
                };
                summary.record(name, state);
            }

            iteration += 1;
            summary.iterations = iteration;

            let more_to_come = iterations.map(|limit| iteration < limit).unwrap_or(true);
            if more_to_come && !self.is_shutting_down() {
                if let Some(sleep) = self.config.sleep {
                    tokio::time::sleep(sleep).await;
                }
            }
        }

        Ok(summary)
    }

    fn select_projects(&self, projects: Option<&[String]>) -> SmokerResult<Vec<String>> {
        match projects {
            Some(requested) => {
                for name in requested {
                    if !self.registry.contains(name) {
                        return Err(SmokerError::unknown_project(name));
                    }
                }
                Ok(requested.to_vec())
            }
            None => Ok(self.registry.smokable_names()),
        }
    }

    /// One project through the state machine; returns its terminal
    /// state for this iteration.
    async fn smoke_one(&mut self, name: &str) -> Result<ProjectState, SmokeError> {
        let project = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| SmokeError::MissingProject(name.to_string()))?;

        if project.dependency_only {
            return Ok(ProjectState::DependencyOnly);
        }

        // CLONING: lazy, at most once per orchestrator lifetime.
        let source = self
            .sources
            .get_mut(name)
            .ok_or_else(|| SmokeError::MissingProject(name.to_string()))?;
        source.ensure_clone().await?;

        // POLLING
        let polled = match self.revisions.get(name).cloned() {
            Some(current) => source.next(&current).await?,
            None => {
                // No recorded revision: bootstrap from the remote tip.
                info!(project = name, "no revision recorded, starting from remote tip");
                source.checkout(None).await?;
                let revision = source.current_revision().await?;
                let committer = source.committer(Some(&revision)).await?;
                Some((revision, committer))
            }
        };

        let Some((revision, committer)) = polled else {
            return Ok(ProjectState::NoChange);
        };

        info!(
            project = name,
            revision = %revision,
            committer = %committer,
            "new revision found"
        );

        // CHECKING_OUT
        let meta = SmokeMeta::for_attempt(name, revision.clone(), committer);
        let mut resolver =
            DependencyResolver::new(&self.registry, &mut self.sources, &self.executor);
        let checkout = resolver
            .checkout_project(&mut self.ctx, name, Some(&revision))
            .await;

        let outcome = match checkout {
            Err(error) if error.is_dependency_failure() => {
                warn!(project = name, error = %error, "dependency chain failed");
                self.cleanup(name, &[]).await;
                let dependency = match &error {
                    CheckoutError::DependencyFailed { dependency, .. } => dependency.clone(),
                    _ => String::new(),
                };
                if self.config.advance_on_dependency_failure {
                    self.persist_revision(name, &revision).await?;
                } else {
                    // Default policy: leave the revision pointer alone so
                    // the unchanged combination is retried next poll.
                    info!(project = name, "revision not advanced after dependency failure");
                }
                return Ok(ProjectState::DependencyFailed { dependency });
            }
            Err(error) => {
                // BUILD_FAILED: skip testing, still persist the revision
                // so a known-broken revision is never retried forever.
                warn!(project = name, error = %error, "build failed");
                self.cleanup(name, &[]).await;
                self.persist_revision(name, &revision).await?;
                return Ok(ProjectState::BuildFailed { revision });
            }
            Ok(outcome) => outcome,
        };

        // TESTING: delegated to the harness; only "could not run at
        // all" is a failure here.
        let request = HarnessRequest {
            root: outcome.root.clone(),
            test_glob: project.test_glob.clone(),
            lib_paths: outcome.lib_paths.clone(),
            jobs: project.jobs,
            meta,
        };
        let harness_result = self.harness.run(&request, &self.ctx).await;

        // CLEANING: always, also when the harness failed.
        self.cleanup(name, &outcome.clean_states).await;

        let archive = match harness_result {
            Ok(archive) => archive,
            Err(error) => {
                warn!(project = name, error = %error, "test harness could not run");
                self.persist_revision(name, &revision).await?;
                return Ok(ProjectState::BuildFailed { revision });
            }
        };

        // REPORTING: a failed send is logged, never blocks persistence.
        let sent = match self.sender.send(&archive).await {
            Ok(outcome) if outcome.success => true,
            Ok(outcome) => {
                error!(project = name, message = %outcome.message, "collector rejected report");
                false
            }
            Err(error) => {
                error!(project = name, error = %error, "report upload failed");
                false
            }
        };

        self.persist_revision(name, &revision).await?;
        Ok(ProjectState::Reported { revision, sent })
    }

    /// Post-attempt cleanup: replay captured clean hooks (most recent
    /// first), revert the working copy, then unconditionally unwind the
    /// environment stack.
    async fn cleanup(&mut self, name: &str, clean_states: &[(String, String)]) {
        for (project_name, state) in clean_states.iter().rev() {
            let Some(project) = self.registry.get(project_name) else {
                continue;
            };
            let Some(clean_cmd) = project.clean_cmd.clone() else {
                continue;
            };
            let Some(source) = self.sources.get(project_name) else {
                continue;
            };
            let root = project.project_root(source.checkout_dir());
            if let Err(e) = self
                .executor
                .run_shell(&clean_cmd, &root, &self.ctx, Some(state.as_str()))
                .await
            {
                warn!(project = %project_name, error = %e, "post-test clean hook failed");
            }
        }

        if let Some(source) = self.sources.get_mut(name) {
            if source.is_cloned() {
                if let Err(e) = source.clean().await {
                    warn!(project = name, error = %e, "working copy clean failed");
                }
            }
        }

        self.ctx.env_mut().pop_all();
    }

    /// Persist progress immediately so a crash loses at most one
    /// iteration's work.
    async fn persist_revision(&mut self, name: &str, revision: &Revision) -> Result<(), SmokeError> {
        self.store.update_revision(name, revision).await?;
        self.revisions.insert(name.to_string(), revision.clone());
        Ok(())
    }
}
