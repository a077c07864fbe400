//! Ledger Service - account state storage maintenance CLI.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_service_lib::{MaintenanceAction, MigrateAction};

#[derive(Parser)]
#[command(name = "ledger-service")]
#[command(about = "Account state storage service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// State maintenance commands
    Maintain {
        #[command(subcommand)]
        action: MaintainCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[derive(Subcommand)]
enum MaintainCommands {
    /// Copy unconfirmed shadow columns onto their confirmed counterparts
    Reconcile,
    /// Remove accounts referencing blocks that no longer exist
    PurgeOrphans,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            ledger_service_lib::run_migrations(migrate_action).await?;
        }
        Commands::Maintain { action } => {
            let maintenance_action = match action {
                MaintainCommands::Reconcile => MaintenanceAction::CommitUnconfirmed,
                MaintainCommands::PurgeOrphans => MaintenanceAction::PurgeOrphans,
            };
            ledger_service_lib::run_maintenance(maintenance_action).await?;
        }
    }

    Ok(())
}
