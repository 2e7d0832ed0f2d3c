//! Application services: the collaborator seams the orchestrator drives.

pub mod harness;
pub mod report;

pub use harness::{HarnessError, HarnessRequest, TestHarness};
pub use report::{ReportError, ReportSender};
