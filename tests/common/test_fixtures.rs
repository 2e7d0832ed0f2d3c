//! Test fixtures for creating test data
//!
//! Provides a git repository builder with controlled commit timestamps
//! (no git binary required) and helpers for writing registry files.

use git2::{Commit, Oid, Repository, Signature, Time};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A local git repository with deterministic history, used as the
/// remote the smoker clones from.
pub struct GitFixture {
    dir: TempDir,
    pub repo: Repository,
    clock: i64,
}

impl GitFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "fixture").unwrap();
            config.set_str("user.email", "fixture@example.com").unwrap();
        }
        Self {
            dir,
            repo,
            clock: 1_700_000_000,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// URI the smoker clones from.
    pub fn url(&self) -> String {
        self.dir.path().display().to_string()
    }

    fn signature(author: &str, when: i64) -> Signature<'static> {
        let email = format!("{}@example.com", author);
        Signature::new(author, &email, &Time::new(when, 0)).unwrap()
    }

    fn head_commit(&self) -> Option<Commit<'_>> {
        self.repo.head().ok().and_then(|h| h.peel_to_commit().ok())
    }

    /// Commit a file change at an explicit timestamp.
    pub fn commit_file_at(
        &mut self,
        file: &str,
        content: &str,
        author: &str,
        message: &str,
        when: i64,
    ) -> String {
        let full = self.dir.path().join(file);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full, content).unwrap();

        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let sig = Self::signature(author, when);
        let parents: Vec<Commit> = self.head_commit().into_iter().collect();
        let parent_refs: Vec<&Commit> = parents.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
        drop(parent_refs);
        drop(parents);
        self.clock = self.clock.max(when);
        oid.to_string()
    }

    /// Commit a file change 100 seconds after the previous commit.
    pub fn commit_file(&mut self, file: &str, content: &str, author: &str, message: &str) -> String {
        let when = self.clock + 100;
        self.commit_file_at(file, content, author, message, when)
    }

    /// Name of the branch HEAD currently points at.
    pub fn head_branch(&self) -> String {
        self.repo.head().unwrap().shorthand().unwrap().to_string()
    }

    /// Create a branch at `target` without switching to it.
    pub fn create_branch(&self, name: &str, target: &str) {
        let commit = self
            .repo
            .find_commit(Oid::from_str(target).unwrap())
            .unwrap();
        self.repo.branch(name, &commit, false).unwrap();
    }

    /// Point HEAD at a branch and update the working tree.
    pub fn checkout_branch(&self, name: &str) {
        self.repo.set_head(&format!("refs/heads/{}", name)).unwrap();
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo.checkout_head(Some(&mut checkout)).unwrap();
    }

    /// Merge commit with the given parents (first parent's tree) on the
    /// current branch, at an explicit timestamp.
    pub fn merge_commit_at(
        &mut self,
        author: &str,
        message: &str,
        parents: &[&str],
        when: i64,
    ) -> String {
        let commits: Vec<Commit> = parents
            .iter()
            .map(|p| self.repo.find_commit(Oid::from_str(p).unwrap()).unwrap())
            .collect();
        let tree = commits[0].tree().unwrap();
        let parent_refs: Vec<&Commit> = commits.iter().collect();
        let sig = Self::signature(author, when);

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
        drop(parent_refs);
        drop(tree);
        drop(commits);
        self.clock = self.clock.max(when);
        oid.to_string()
    }

    /// Commit timestamp of `revision`.
    pub fn commit_time(&self, revision: &str) -> i64 {
        self.repo
            .find_commit(Oid::from_str(revision).unwrap())
            .unwrap()
            .time()
            .seconds()
    }
}

impl Default for GitFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// One project entry for a generated registry file.
pub struct RegistryEntry {
    pub name: String,
    pub uri: String,
    pub scm: String,
    pub revision: Option<String>,
    pub configure_cmd: Option<String>,
    pub clean_cmd: Option<String>,
    pub dependencies: Vec<String>,
    pub dependency_only: bool,
    pub test_glob: Option<String>,
}

impl RegistryEntry {
    pub fn git(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            scm: "git".to_string(),
            revision: None,
            configure_cmd: None,
            clean_cmd: None,
            dependencies: Vec::new(),
            dependency_only: false,
            test_glob: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_configure_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.configure_cmd = Some(cmd.into());
        self
    }

    pub fn with_clean_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.clean_cmd = Some(cmd.into());
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<&str>) -> Self {
        self.dependencies = dependencies.into_iter().map(String::from).collect();
        self
    }

    pub fn with_dependency_only(mut self) -> Self {
        self.dependency_only = true;
        self
    }

    pub fn with_test_glob(mut self, glob: impl Into<String>) -> Self {
        self.test_glob = Some(glob.into());
        self
    }

    fn to_yaml(&self) -> String {
        let mut yaml = format!(
            "{}:\n  repository:\n    type: {}\n    uri: \"{}\"\n",
            self.name, self.scm, self.uri
        );
        if let Some(revision) = &self.revision {
            yaml.push_str(&format!("  revision: \"{}\"\n", revision));
        }
        if let Some(cmd) = &self.configure_cmd {
            yaml.push_str(&format!("  configure_cmd: \"{}\"\n", cmd));
        }
        if let Some(cmd) = &self.clean_cmd {
            yaml.push_str(&format!("  clean_cmd: \"{}\"\n", cmd));
        }
        if let Some(glob) = &self.test_glob {
            yaml.push_str(&format!("  test_glob: \"{}\"\n", glob));
        }
        if !self.dependencies.is_empty() {
            yaml.push_str("  dependencies:\n");
            for dependency in &self.dependencies {
                yaml.push_str(&format!("    - {}\n", dependency));
            }
        }
        if self.dependency_only {
            yaml.push_str("  dependency_only: true\n");
        }
        yaml
    }
}

/// Write a registry file for the given entries, returning its path.
pub fn write_registry(dir: &Path, entries: &[RegistryEntry]) -> PathBuf {
    let mut content = String::new();
    for entry in entries {
        content.push_str(&entry.to_yaml());
    }
    let path = dir.join("smoker.yml");
    fs::write(&path, content).unwrap();
    path
}
