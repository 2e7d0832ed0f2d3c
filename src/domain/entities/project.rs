use crate::domain::value_objects::repository_spec::RepositorySpec;
use crate::domain::value_objects::revision::Revision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default test-file glob, relative to the project root.
pub const DEFAULT_TEST_GLOB: &str = "t/*.t t/*/t/*.t";

fn default_test_glob() -> String {
    DEFAULT_TEST_GLOB.to_string()
}

fn is_default_test_glob(glob: &String) -> bool {
    glob == DEFAULT_TEST_GLOB
}

/// One project entry in the smoker registry.
///
/// The project name is the registry map key and is injected after
/// deserialization, so it is skipped by serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (unique registry key)
    #[serde(skip)]
    pub name: String,

    /// Where the project's source lives
    pub repository: RepositorySpec,

    /// Last known-good revision; rewritten after every attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,

    /// Directory of the project inside the checkout (relative)
    #[serde(default)]
    pub root_dir: String,

    /// Build/configure command, run in the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure_cmd: Option<String>,

    /// Pre/post-test clean hook
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_cmd: Option<String>,

    /// Whitespace-separated test-file globs, relative to the project root
    #[serde(default = "default_test_glob", skip_serializing_if = "is_default_test_glob")]
    pub test_glob: String,

    /// Extra environment variables for this project's build and tests
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Projects that must be checked out and configured first, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Present solely as a prerequisite; never polled or tested directly
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dependency_only: bool,

    /// Additional library paths, relative to the project root
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libs: Vec<String>,

    /// Parallel test jobs passed through to the harness
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<u32>,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>, repository: RepositorySpec) -> Self {
        Self {
            name: name.into(),
            repository,
            revision: None,
            root_dir: String::new(),
            configure_cmd: None,
            clean_cmd: None,
            test_glob: default_test_glob(),
            env: BTreeMap::new(),
            dependencies: Vec::new(),
            dependency_only: false,
            libs: Vec::new(),
            jobs: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<Revision>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<String>) -> Self {
        self.root_dir = root_dir.into();
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

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_dependency_only(mut self, dependency_only: bool) -> Self {
        self.dependency_only = dependency_only;
        self
    }

    pub fn with_libs(mut self, libs: Vec<String>) -> Self {
        self.libs = libs;
        self
    }

    pub fn with_jobs(mut self, jobs: u32) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Project root inside a checkout directory.
    pub fn project_root(&self, checkout_dir: &Path) -> PathBuf {
        if self.root_dir.is_empty() {
            checkout_dir.to_path_buf()
        } else {
            checkout_dir.join(&self.root_dir)
        }
    }

    /// Name of the synthesized root environment variable,
    /// `CHIMPS_<NAME>_ROOT` with non-alphanumeric characters mapped to `_`.
    pub fn root_env_name(&self) -> String {
        let mut upper = String::with_capacity(self.name.len());
        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() {
                upper.extend(c.to_uppercase());
            } else {
                upper.push('_');
            }
        }
        format!("CHIMPS_{}_ROOT", upper)
    }

    /// Library paths this project itself contributes: `<root>/blib/lib`
    /// plus the declared `libs`, all resolved against the project root.
    pub fn own_lib_paths(&self, checkout_dir: &Path) -> Vec<PathBuf> {
        let root = self.project_root(checkout_dir);
        let mut paths = vec![root.join("blib").join("lib")];
        for lib in &self.libs {
            paths.push(root.join(lib));
        }
        paths
    }
}

/// The loaded project registry: name → config, names unique by
/// construction (YAML mapping keys).
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: BTreeMap<String, ProjectConfig>,
}

impl ProjectRegistry {
    pub fn new(projects: BTreeMap<String, ProjectConfig>) -> Self {
        Self { projects }
    }

    pub fn get(&self, name: &str) -> Option<&ProjectConfig> {
        self.projects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.projects.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProjectConfig)> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Projects eligible for direct smoking, in registry order:
    /// everything that is not `dependency_only`.
    pub fn smokable_names(&self) -> Vec<String> {
        self.projects
            .iter()
            .filter(|(_, p)| !p.dependency_only)
            .map(|(name, _)| name.clone())
            .collect()
    }
}
