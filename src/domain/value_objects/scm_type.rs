use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SCM (Source Control Management) system type
///
/// Closed set of repository kinds the smoker can poll. The config file
/// declares the tag; the source factory turns it into a concrete
/// implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmType {
    /// Git version control system
    Git,
    /// Subversion (SVN) version control system
    Svn,
}

impl Default for ScmType {
    fn default() -> Self {
        Self::Git
    }
}

impl fmt::Display for ScmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmType::Git => write!(f, "git"),
            ScmType::Svn => write!(f, "svn"),
        }
    }
}

impl FromStr for ScmType {
    type Err = ScmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "git" => Ok(ScmType::Git),
            "svn" | "subversion" => Ok(ScmType::Svn),
            _ => Err(ScmTypeError::UnsupportedScmType(s.to_string())),
        }
    }
}

impl ScmType {
    /// Whether revisions for this SCM are monotonically increasing numbers
    pub fn has_numeric_revisions(&self) -> bool {
        match self {
            ScmType::Git => false,
            ScmType::Svn => true,
        }
    }

    /// Get the metadata directory name for this SCM
    pub fn metadata_dir(&self) -> &'static str {
        match self {
            ScmType::Git => ".git",
            ScmType::Svn => ".svn",
        }
    }

    /// Get the standard executable name for this SCM
    pub fn executable_name(&self) -> &'static str {
        match self {
            ScmType::Git => "git",
            ScmType::Svn => "svn",
        }
    }

    /// Check if the URL scheme is appropriate for this SCM type
    pub fn is_valid_url_scheme(&self, url: &str) -> bool {
        match self {
            ScmType::Git => {
                url.starts_with("https://")
                    || url.starts_with("http://")
                    || url.starts_with("git://")
                    || url.starts_with("ssh://")
                    || url.starts_with("git@")
                    || url.starts_with("file://")
                    || url.starts_with('/')
            }
            ScmType::Svn => {
                url.starts_with("https://")
                    || url.starts_with("http://")
                    || url.starts_with("svn://")
                    || url.starts_with("svn+ssh://")
                    || url.starts_with("file://")
            }
        }
    }
}

/// Errors that can occur when working with SCM types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScmTypeError {
    /// The specified SCM type is not supported
    UnsupportedScmType(String),
}

impl fmt::Display for ScmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmTypeError::UnsupportedScmType(scm) => {
                write!(
                    f,
                    "Unsupported SCM type: '{}'. Supported types are: git, svn",
                    scm
                )
            }
        }
    }
}

impl std::error::Error for ScmTypeError {}
