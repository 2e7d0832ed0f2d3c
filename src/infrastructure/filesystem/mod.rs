//! File system infrastructure: the persisted project registry.

pub mod config_store;

pub use config_store::{ConfigStore, ConfigStoreError};
