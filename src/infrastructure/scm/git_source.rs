use super::source::{CheckoutState, RepositorySource, SourceError};
use crate::domain::value_objects::revision::Revision;
use crate::domain::value_objects::scm_type::ScmType;
use async_trait::async_trait;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{BranchType, Commit, Oid, Repository, Sort};
use std::path::{Path, PathBuf};

/// Git implementation of the repository source, backed by libgit2.
pub struct GitSource {
    uri: String,
    dest: PathBuf,
    state: CheckoutState,
    repo: Option<Repository>,
}

impl GitSource {
    pub fn new(uri: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            uri: uri.into(),
            dest: dest.into(),
            state: CheckoutState::default(),
            repo: None,
        }
    }

    fn repo_ref(&self) -> Result<&Repository, SourceError> {
        self.repo
            .as_ref()
            .ok_or_else(|| SourceError::not_cloned(&self.dest))
    }

    fn resolve_commit<'r>(
        repo: &'r Repository,
        revision: &Revision,
    ) -> Result<Commit<'r>, SourceError> {
        let object = repo
            .revparse_single(revision.as_str())
            .map_err(|_| SourceError::unknown_revision(revision))?;
        object
            .peel_to_commit()
            .map_err(|_| SourceError::unknown_revision(revision))
    }

    /// Commit at the remote tip: `origin/HEAD` when present, otherwise
    /// the conventional default branches, otherwise the first remote
    /// branch.
    fn tip_commit(repo: &Repository) -> Result<Commit<'_>, SourceError> {
        if let Ok(reference) = repo.find_reference("refs/remotes/origin/HEAD") {
            if let Ok(resolved) = reference.resolve() {
                if let Some(oid) = resolved.target() {
                    return Ok(repo.find_commit(oid)?);
                }
            }
        }

        for name in ["origin/main", "origin/master"] {
            if let Ok(branch) = repo.find_branch(name, BranchType::Remote) {
                if let Some(oid) = branch.get().target() {
                    return Ok(repo.find_commit(oid)?);
                }
            }
        }

        let branches = repo.branches(Some(BranchType::Remote))?;
        for branch in branches {
            let (branch, _) = branch?;
            if branch.name()?.map(|n| n.ends_with("/HEAD")).unwrap_or(true) {
                continue;
            }
            if let Some(oid) = branch.get().target() {
                return Ok(repo.find_commit(oid)?);
            }
        }

        Err(SourceError::git_error("remote has no branches"))
    }

    fn detach_to(repo: &Repository, oid: Oid) -> Result<(), SourceError> {
        let object = repo.find_object(oid, None)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(&object, Some(&mut checkout))?;
        repo.set_head_detached(oid)?;
        Ok(())
    }

    fn fetch_origin(repo: &Repository) -> Result<(), SourceError> {
        let mut remote = repo.find_remote("origin")?;
        remote.fetch(&[] as &[&str], None, None)?;
        Ok(())
    }

    /// Commits reachable from the remote tip but not from `current`,
    /// oldest first, restricted to commits dated no earlier than
    /// `current` itself. The date floor is what makes diamond-merge
    /// topologies terminate instead of alternating between branch tips.
    fn walk_after(repo: &Repository, current: &Revision) -> Result<Option<Revision>, SourceError> {
        let current_commit = Self::resolve_commit(repo, current)?;
        let cutoff = current_commit.time().seconds();
        let tip = Self::tip_commit(repo)?;

        if tip.id() == current_commit.id() {
            return Ok(None);
        }

        let mut walk = repo.revwalk()?;
        walk.push(tip.id())?;
        walk.hide(current_commit.id())?;
        walk.set_sorting(Sort::TIME | Sort::REVERSE)?;

        for oid in walk {
            let oid = oid?;
            let commit = repo.find_commit(oid)?;
            if commit.time().seconds() >= cutoff {
                return Ok(Some(Revision::new(oid.to_string())));
            }
        }

        Ok(None)
    }

    fn author_name(commit: &Commit<'_>) -> String {
        let author = commit.author();
        match author.name() {
            Some(name) => name.to_string(),
            None => String::from_utf8_lossy(author.name_bytes()).to_string(),
        }
    }
}

#[async_trait]
impl RepositorySource for GitSource {
    fn scm_type(&self) -> ScmType {
        ScmType::Git
    }

    fn checkout_dir(&self) -> &Path {
        &self.dest
    }

    fn is_cloned(&self) -> bool {
        self.state.cloned
    }

    async fn ensure_clone(&mut self) -> Result<PathBuf, SourceError> {
        if self.repo.is_none() {
            let repo = if self.dest.join(".git").exists() {
                Repository::open(&self.dest)?
            } else {
                if let Some(parent) = self.dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                RepoBuilder::new()
                    .clone(&self.uri, &self.dest)
                    .map_err(|e| {
                        SourceError::clone_failed(format!(
                            "git clone of {} failed: {}",
                            self.uri,
                            e.message()
                        ))
                    })?
            };
            self.repo = Some(repo);
            self.state.mark_cloned(&self.dest);
        }
        Ok(self.dest.clone())
    }

    async fn checkout(&mut self, revision: Option<&Revision>) -> Result<(), SourceError> {
        self.ensure_clone().await?;
        let repo = self.repo_ref()?;
        let oid = match revision {
            Some(revision) => Self::resolve_commit(repo, revision)?.id(),
            None => {
                Self::fetch_origin(repo)?;
                Self::tip_commit(repo)?.id()
            }
        };
        Self::detach_to(repo, oid)
            .map_err(|e| SourceError::checkout_failed(format!("git checkout failed: {}", e)))
    }

    async fn current_revision(&mut self) -> Result<Revision, SourceError> {
        let repo = self.repo_ref()?;
        let commit = repo.head()?.peel_to_commit()?;
        Ok(Revision::new(commit.id().to_string()))
    }

    async fn clean(&mut self) -> Result<(), SourceError> {
        let repo = self.repo_ref()?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        repo.checkout_head(Some(&mut checkout))
            .map_err(|e| SourceError::clean_failed(format!("git clean failed: {}", e)))
    }

    async fn update_remote(&mut self) -> Result<(), SourceError> {
        let repo = self.repo_ref()?;
        Self::fetch_origin(repo)
            .map_err(|e| SourceError::poll_failed(format!("git fetch failed: {}", e)))
    }

    async fn revision_after(
        &mut self,
        current: &Revision,
    ) -> Result<Option<Revision>, SourceError> {
        let repo = self.repo_ref()?;
        Self::walk_after(repo, current)
    }

    async fn committer(&mut self, revision: Option<&Revision>) -> Result<String, SourceError> {
        let repo = self.repo_ref()?;
        let commit = match revision {
            Some(revision) => Self::resolve_commit(repo, revision)?,
            None => Self::tip_commit(repo)?,
        };
        Ok(Self::author_name(&commit))
    }
}
