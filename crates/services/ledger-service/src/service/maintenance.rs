//! Ledger maintenance - Handles periodic state housekeeping.

use async_trait::async_trait;
use std::sync::Arc;

use common::AppResult;

use crate::repository::AccountsRepository;

/// Maintenance service trait for dependency injection.
#[async_trait]
pub trait LedgerMaintenance: Send + Sync {
    /// Remove accounts whose block reference matches no existing block.
    /// Returns the number of accounts purged.
    async fn purge_orphaned(&self) -> AppResult<u64>;

    /// Apply unconfirmed shadow columns onto their confirmed
    /// counterparts across all accounts. Returns the rows touched.
    async fn commit_unconfirmed(&self) -> AppResult<u64>;
}

/// Concrete implementation of [`LedgerMaintenance`].
pub struct Maintainer {
    accounts: Arc<dyn AccountsRepository>,
}

impl Maintainer {
    /// Create new maintenance service
    pub fn new(accounts: Arc<dyn AccountsRepository>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl LedgerMaintenance for Maintainer {
    async fn purge_orphaned(&self) -> AppResult<u64> {
        let orphaned = self.accounts.get_orphaned().await?;
        let mut purged = 0;
        for orphan in &orphaned {
            tracing::warn!(
                address = %orphan.address,
                block_id = ?orphan.block_id,
                "removing account with dangling block reference"
            );
            purged += self.accounts.remove(&orphan.address).await?;
        }
        tracing::info!(purged, "orphaned account sweep finished");
        Ok(purged)
    }

    async fn commit_unconfirmed(&self) -> AppResult<u64> {
        let rows = self.accounts.commit_unconfirmed().await?;
        tracing::info!(rows, "unconfirmed state applied to confirmed columns");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockAccountsRepository, OrphanedAccount};
    use common::AppError;

    #[tokio::test]
    async fn test_purge_removes_each_orphaned_account() {
        let mut repo = MockAccountsRepository::new();
        repo.expect_get_orphaned().returning(|| {
            Ok(vec![
                OrphanedAccount {
                    address: "1L".to_string(),
                    block_id: Some("missing-1".to_string()),
                },
                OrphanedAccount {
                    address: "2L".to_string(),
                    block_id: Some("missing-2".to_string()),
                },
            ])
        });
        repo.expect_remove()
            .times(2)
            .withf(|address| address == "1L" || address == "2L")
            .returning(|_| Ok(1));

        let service = Maintainer::new(Arc::new(repo));
        assert_eq!(service.purge_orphaned().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_purge_with_no_orphans_removes_nothing() {
        let mut repo = MockAccountsRepository::new();
        repo.expect_get_orphaned().returning(|| Ok(vec![]));
        repo.expect_remove().times(0);

        let service = Maintainer::new(Arc::new(repo));
        assert_eq!(service.purge_orphaned().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_propagates_repository_errors() {
        let mut repo = MockAccountsRepository::new();
        repo.expect_get_orphaned()
            .returning(|| Err(AppError::internal("store unavailable")));

        let service = Maintainer::new(Arc::new(repo));
        assert!(service.purge_orphaned().await.is_err());
    }

    #[tokio::test]
    async fn test_commit_unconfirmed_reports_rows_touched() {
        let mut repo = MockAccountsRepository::new();
        repo.expect_commit_unconfirmed().returning(|| Ok(7));

        let service = Maintainer::new(Arc::new(repo));
        assert_eq!(service.commit_unconfirmed().await.unwrap(), 7);
    }
}
