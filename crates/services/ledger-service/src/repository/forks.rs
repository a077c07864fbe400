//! Forks repository.
//!
//! Append-only audit trail of detected chain forks. Rows are written once
//! and never updated or deleted through this interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{InsertStatement, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, Value};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use common::{AppError, AppResult};
use domain::Fork;

use super::columns::FORKS;
use super::Record;

/// Forks repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ForksRepository: Send + Sync {
    /// Record one detected fork
    async fn insert(&self, fork: Fork) -> AppResult<()>;
}

fn fork_record(fork: &Fork, recorded_at: DateTime<Utc>) -> Record {
    let mut record = Record::new();
    record.insert(
        "delegate_public_key".to_string(),
        Value::from(fork.delegate_public_key.clone()),
    );
    record.insert("block_id".to_string(), Value::from(fork.block_id.clone()));
    record.insert("block_height".to_string(), Value::from(fork.block_height));
    if let Some(previous) = &fork.previous_block_id {
        record.insert("previous_block_id".to_string(), Value::from(previous.clone()));
    }
    record.insert(
        "block_timestamp".to_string(),
        Value::from(fork.block_timestamp),
    );
    record.insert("cause".to_string(), Value::from(fork.cause.code()));
    record.insert("recorded_at".to_string(), Value::from(recorded_at));
    record
}

fn build_fork_insert(fork: &Fork, recorded_at: DateTime<Utc>) -> AppResult<InsertStatement> {
    if fork.block_id.is_empty() {
        return Err(AppError::validation("missing required field: block_id"));
    }
    if fork.delegate_public_key.is_empty() {
        return Err(AppError::validation(
            "missing required field: delegate_public_key",
        ));
    }
    let record = fork_record(fork, recorded_at);
    let (columns, values) = FORKS.insert_values(&record)?;
    let mut insert = Query::insert();
    insert.into_table(FORKS.table()).columns(columns);
    insert
        .values(values)
        .map_err(|e| AppError::internal(e.to_string()))?;
    Ok(insert)
}

/// Concrete implementation of [`ForksRepository`].
pub struct ForkStore {
    db: DatabaseConnection,
}

impl ForkStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ForksRepository for ForkStore {
    async fn insert(&self, fork: Fork) -> AppResult<()> {
        let insert = build_fork_insert(&fork, fork.recorded_at.unwrap_or_else(Utc::now))?;
        let stmt = self.db.get_database_backend().build(&insert);
        self.db.execute(stmt).await?;
        Ok(())
    }
}
