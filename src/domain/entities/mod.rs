//! Core domain entities.

pub mod project;
pub mod smoke_result;

pub use project::{ProjectConfig, ProjectRegistry, DEFAULT_TEST_GLOB};
pub use smoke_result::{
    ProjectState, ReportArchive, SendOutcome, SmokeMeta, SmokeSummary,
};
