//! Type-safe value objects for the smoker domain.

pub mod repository_spec;
pub mod revision;
pub mod scm_type;

pub use repository_spec::{RepositorySpec, RepositorySpecError};
pub use revision::Revision;
pub use scm_type::{ScmType, ScmTypeError};
