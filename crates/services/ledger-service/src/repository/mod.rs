//! Repository layer.
//!
//! Table-backed repositories offering a declarative record contract:
//! column-set definitions as data, dynamic field projection, filter
//! translation, conflict-aware upsert, and satellite-table management.
//! Each operation maps to exactly one parameterized statement.

pub mod accounts;
pub mod columns;
pub mod filters;
pub mod forks;

use std::collections::BTreeMap;

use sea_orm::Value;

/// A dynamic record payload: logical field name to value.
///
/// Which fields actually reach the store is decided by the operation's
/// column set, never by the payload itself.
pub type Record = BTreeMap<String, Value>;

pub use accounts::{AccountsRepository, AccountsStore, OrphanedAccount};
pub use filters::{Filter, Filters, ListOptions, SortDirection, SortKey};
pub use forks::{ForkStore, ForksRepository};

#[cfg(any(test, feature = "test-utils"))]
pub use accounts::MockAccountsRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use forks::MockForksRepository;
