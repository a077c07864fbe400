//! Ledger Service Library
//!
//! Table-backed account and fork repositories over a relational store,
//! plus the maintenance operations that keep the account state tables
//! healthy. It can be driven from the bundled CLI or embedded by other
//! node components.

pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tracing::info;

use crate::config::LedgerServiceConfig;
use crate::infra::Database;
use crate::repository::AccountsStore;
use crate::service::{LedgerMaintenance, Maintainer};

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Maintenance action type.
#[derive(Debug, Clone, Copy)]
pub enum MaintenanceAction {
    /// Apply unconfirmed shadow columns onto confirmed counterparts
    CommitUnconfirmed,
    /// Remove accounts whose block reference no longer resolves
    PurgeOrphans,
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = LedgerServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database_url).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Run a maintenance action (for CLI commands).
pub async fn run_maintenance(action: MaintenanceAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = LedgerServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database_url).await?;
    db.ping().await?;

    let accounts = Arc::new(AccountsStore::new(db.get_connection()));
    let service = Maintainer::new(accounts);

    match action {
        MaintenanceAction::CommitUnconfirmed => {
            let rows = service.commit_unconfirmed().await?;
            info!(rows, "confirmed columns synchronized");
        }
        MaintenanceAction::PurgeOrphans => {
            let purged = service.purge_orphaned().await?;
            info!(purged, "orphaned accounts removed");
        }
    }

    Ok(())
}
