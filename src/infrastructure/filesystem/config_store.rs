use crate::domain::entities::project::{ProjectConfig, ProjectRegistry};
use crate::domain::value_objects::revision::Revision;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs as async_fs;
use tracing::{debug, info};

/// Config store related errors
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Registry file not found at path: {0}")]
    FileNotFound(String),

    #[error("Registry file read failed: {0}")]
    ReadFailed(String),

    #[error("Registry file write failed: {0}")]
    WriteFailed(String),

    #[error("YAML parsing failed: {0}")]
    YamlParsingFailed(String),

    #[error("Registry validation failed for project '{project}': {message}")]
    ValidationFailed { project: String, message: String },

    #[error("Project not found in registry: {0}")]
    ProjectNotFound(String),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Loads and persists the project registry.
///
/// The registry is a YAML mapping of project name to project config.
/// Revisions are rewritten one project at a time through
/// [`ConfigStore::update_revision`], which re-reads the file and only
/// touches the target field so unrelated external edits survive
/// (single-writer assumption).
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, migrating legacy flat repository URIs to the
    /// nested `{type, uri}` form. A migrated registry is persisted
    /// immediately so the legacy form is parsed at most once.
    pub async fn load(&self) -> Result<ProjectRegistry, ConfigStoreError> {
        if !self.path.exists() {
            return Err(ConfigStoreError::FileNotFound(
                self.path.display().to_string(),
            ));
        }

        let content = async_fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigStoreError::ReadFailed(format!("{}: {}", self.path.display(), e)))?;

        let mut projects: BTreeMap<String, ProjectConfig> = serde_yaml::from_str(&content)
            .map_err(|e| ConfigStoreError::YamlParsingFailed(e.to_string()))?;

        let mut migrated = false;
        for (name, project) in projects.iter_mut() {
            project.name = name.clone();
            migrated |= project.repository.migrated;
            project.repository.validate().map_err(|e| {
                ConfigStoreError::ValidationFailed {
                    project: name.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        let registry = ProjectRegistry::new(projects);

        if migrated {
            info!(
                path = %self.path.display(),
                "migrated legacy repository entries, rewriting registry"
            );
            self.save(&registry).await?;
        }

        Ok(registry)
    }

    /// Persist the whole registry.
    pub async fn save(&self, registry: &ProjectRegistry) -> Result<(), ConfigStoreError> {
        let map: BTreeMap<&String, &ProjectConfig> = registry.iter().collect();
        let yaml = serde_yaml::to_string(&map)?;
        self.write_atomically(&yaml).await
    }

    /// Overwrite only `project`'s revision field, leaving every other
    /// part of the file as currently persisted.
    pub async fn update_revision(
        &self,
        project: &str,
        revision: &Revision,
    ) -> Result<(), ConfigStoreError> {
        let content = async_fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigStoreError::ReadFailed(format!("{}: {}", self.path.display(), e)))?;

        let mut root: serde_yaml::Value = serde_yaml::from_str(&content)
            .map_err(|e| ConfigStoreError::YamlParsingFailed(e.to_string()))?;

        let mapping = root
            .as_mapping_mut()
            .ok_or_else(|| ConfigStoreError::YamlParsingFailed("registry is not a mapping".into()))?;

        let key = serde_yaml::Value::String(project.to_string());
        let entry = mapping
            .get_mut(&key)
            .ok_or_else(|| ConfigStoreError::ProjectNotFound(project.to_string()))?;

        let entry_mapping = entry.as_mapping_mut().ok_or_else(|| {
            ConfigStoreError::YamlParsingFailed(format!("project '{}' is not a mapping", project))
        })?;

        entry_mapping.insert(
            serde_yaml::Value::String("revision".to_string()),
            serde_yaml::Value::String(revision.as_str().to_string()),
        );

        debug!(project, revision = %revision, "persisting revision");
        let yaml = serde_yaml::to_string(&root)?;
        self.write_atomically(&yaml).await
    }

    async fn write_atomically(&self, content: &str) -> Result<(), ConfigStoreError> {
        let tmp = self.path.with_extension("tmp");
        async_fs::write(&tmp, content)
            .await
            .map_err(|e| ConfigStoreError::WriteFailed(format!("{}: {}", tmp.display(), e)))?;
        async_fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ConfigStoreError::WriteFailed(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}
