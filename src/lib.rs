//! # chimps-smoker - Repository Smoke Tester
//!
//! `chimps-smoker` polls a set of configured source repositories (Git or
//! Subversion) for new revisions and smoke-tests every change: the
//! changed project is checked out together with its declared dependency
//! chain, configured, run through its test suite, and the resulting
//! report is forwarded to a remote collector. Revision progress is
//! persisted back into the registry file after every attempt.
//!
//! ## Quick Start
//!
//! 1. Create a registry file (`smoker.yml`):
//!
//! ```yaml
//! my-app:
//!   repository:
//!     type: git
//!     uri: "https://github.com/example/my-app.git"
//!   revision: 4a3f21d
//!   configure_cmd: "perl Makefile.PL && make"
//!   dependencies:
//!     - my-lib
//! my-lib:
//!   repository:
//!     type: svn
//!     uri: "svn://svn.example.com/my-lib"
//!   revision: 1042
//!   dependency_only: true
//! ```
//!
//! 2. Start the poller:
//!
//! ```bash
//! chimps-smoker smoke --config smoker.yml --server https://smoke.example.com/report
//! ```
//!
//! ## Architecture
//!
//! The crate is organized using clean architecture principles:
//!
//! - [`domain`]: Project registry entities and value objects
//! - [`application`]: Use cases and collaborator seams
//! - [`infrastructure`]: Repository sources, registry persistence, process execution
//! - [`presentation`]: CLI interface
//! - [`common`]: Shared error handling
//!
//! ## Domain Model
//!
//! - [`domain::entities::project::ProjectConfig`]: One project in the registry
//! - [`domain::value_objects::repository_spec::RepositorySpec`]: Type-tagged repository location
//! - [`domain::value_objects::revision::Revision`]: Opaque history pointer
//!
//! ## Use Cases
//!
//! - [`application::use_cases::checkout_project`]: Dependency-aware checkout
//! - [`application::use_cases::smoke_projects`]: The per-project smoke state machine
//!
//! ## Concurrency Model
//!
//! One orchestrator is one logical thread of control: projects are
//! smoked strictly sequentially because checkout and build share an
//! execution context (working directory and environment overlay). Run
//! independent orchestrator processes for cross-project parallelism.
//!
//! ## Error Handling
//!
//! - [`common::error::SmokerError`]: Boundary error type
//! - [`common::result::SmokerResult`]: Crate-wide result alias

#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types for convenience
pub use crate::common::error::SmokerError;
pub use crate::common::result::SmokerResult as Result;
