//! Common utilities shared across the ledger service crates.
//!
//! This crate provides:
//! - The unified application error taxonomy
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
