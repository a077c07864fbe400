//! Service layer.

pub mod maintenance;

pub use maintenance::{LedgerMaintenance, Maintainer};
