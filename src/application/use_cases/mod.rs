//! Application use cases: dependency-aware checkout and the smoke loop.

pub mod checkout_project;
pub mod smoke_projects;

pub use checkout_project::{CheckoutError, CheckoutOutcome, DependencyResolver, SourceMap};
pub use smoke_projects::{SmokeConfig, SmokeError, SmokeOrchestrator};
