//! Infrastructure layer: external-system interactions.
//!
//! - Repository sources (Git via libgit2, Subversion via the svn CLI)
//! - File system operations (the persisted project registry)
//! - Process execution (execution context, env stacking, child commands)
//! - Test harness and report delivery adapters

pub mod filesystem;
pub mod harness;
pub mod process;
pub mod report;
pub mod scm;

pub use filesystem::config_store::ConfigStore;
pub use harness::CommandHarness;
pub use process::{CommandExecutor, EnvironmentStack, ExecutionContext};
pub use report::{HttpReportSender, NullReportSender};
pub use scm::{RepositorySource, SourceError, SourceFactory};
