//! Test-harness adapters.

pub mod command_harness;

pub use command_harness::{expand_test_globs, CommandHarness, LIB_PATHS_ENV};
