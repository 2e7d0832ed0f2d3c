use super::scm_type::ScmType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared location of a project's repository: a type tag plus a URI.
///
/// Older registry files carried a flat URI string instead of the nested
/// `{type, uri}` mapping; those still deserialize (the type is inferred
/// from the URI scheme) and are marked so the store can rewrite the file
/// in the current form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySpec {
    /// SCM kind, declared as `type` in the registry
    #[serde(rename = "type")]
    pub scm: ScmType,

    /// Repository location
    pub uri: String,

    /// Set when this spec was parsed from the legacy flat form
    #[serde(skip)]
    pub migrated: bool,
}

impl RepositorySpec {
    pub fn new(scm: ScmType, uri: impl Into<String>) -> Self {
        Self {
            scm,
            uri: uri.into(),
            migrated: false,
        }
    }

    /// Infer the SCM type from a bare URI (legacy registry form).
    fn infer_scm(uri: &str) -> ScmType {
        if uri.starts_with("svn://") || uri.starts_with("svn+ssh://") {
            ScmType::Svn
        } else {
            ScmType::Git
        }
    }

    /// Validate the URI against the declared SCM type.
    pub fn validate(&self) -> Result<(), RepositorySpecError> {
        if self.uri.trim().is_empty() {
            return Err(RepositorySpecError::EmptyUri);
        }
        if !self.scm.is_valid_url_scheme(&self.uri) {
            return Err(RepositorySpecError::SchemeMismatch {
                scm: self.scm,
                uri: self.uri.clone(),
            });
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for RepositorySpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Nested {
                #[serde(rename = "type")]
                scm: ScmType,
                uri: String,
            },
            Flat(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Nested { scm, uri } => Ok(RepositorySpec {
                scm,
                uri,
                migrated: false,
            }),
            Raw::Flat(uri) => Ok(RepositorySpec {
                scm: RepositorySpec::infer_scm(&uri),
                uri,
                migrated: true,
            }),
        }
    }
}

/// Errors raised when validating a repository spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySpecError {
    /// The URI field is empty
    EmptyUri,
    /// The URI scheme does not match the declared SCM type
    SchemeMismatch { scm: ScmType, uri: String },
}

impl fmt::Display for RepositorySpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositorySpecError::EmptyUri => write!(f, "repository uri is empty"),
            RepositorySpecError::SchemeMismatch { scm, uri } => {
                write!(f, "uri '{}' is not valid for {} repositories", uri, scm)
            }
        }
    }
}

impl std::error::Error for RepositorySpecError {}
