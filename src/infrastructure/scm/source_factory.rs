use super::git_source::GitSource;
use super::source::RepositorySource;
use super::svn_source::SvnSource;
use crate::domain::value_objects::repository_spec::RepositorySpec;
use crate::domain::value_objects::scm_type::ScmType;
use std::path::PathBuf;

/// Factory turning a config-declared repository spec into a concrete
/// source. Adding an SCM kind means adding a variant here and an
/// implementation next to the existing ones.
pub struct SourceFactory;

impl SourceFactory {
    /// Create the source for `spec`, checking out into `dest`.
    pub fn create(spec: &RepositorySpec, dest: PathBuf) -> Box<dyn RepositorySource> {
        match spec.scm {
            ScmType::Git => Box::new(GitSource::new(&spec.uri, dest)),
            ScmType::Svn => Box::new(SvnSource::new(&spec.uri, dest)),
        }
    }
}
