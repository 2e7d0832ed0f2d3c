//! Report delivery adapters.

pub mod http_sender;

pub use http_sender::{HttpReportSender, NullReportSender};
