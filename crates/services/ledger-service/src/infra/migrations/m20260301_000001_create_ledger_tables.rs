//! Migration: Create the core ledger tables (blocks, accounts, forks).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Minimal blocks table; owned by the chain component, created here
        // so the orphan join is self-contained in sandboxed databases.
        manager
            .create_table(
                Table::create()
                    .table(Blocks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Blocks::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Blocks::Height).big_integer().not_null())
                    .col(ColumnDef::new(Blocks::Timestamp).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .col(
                        ColumnDef::new(Accounts::Address)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::PublicKey).binary().null())
                    .col(ColumnDef::new(Accounts::SecondPublicKey).binary().null())
                    .col(ColumnDef::new(Accounts::Username).text().null())
                    .col(ColumnDef::new(Accounts::UUsername).text().null())
                    .col(small_flag(Accounts::IsDelegate, 0))
                    .col(small_flag(Accounts::UIsDelegate, 0))
                    .col(small_flag(Accounts::SecondSignature, 0))
                    .col(small_flag(Accounts::USecondSignature, 0))
                    .col(small_flag(Accounts::NameExist, 0))
                    .col(small_flag(Accounts::UNameExist, 0))
                    .col(big_counter(Accounts::Balance))
                    .col(big_counter(Accounts::UBalance))
                    .col(big_counter(Accounts::Vote))
                    .col(small_flag(Accounts::MultiMin, 0))
                    .col(small_flag(Accounts::UMultiMin, 0))
                    .col(small_flag(Accounts::MultiLifetime, 0))
                    .col(small_flag(Accounts::UMultiLifetime, 0))
                    .col(big_counter(Accounts::Fees))
                    .col(big_counter(Accounts::Rewards))
                    .col(big_counter(Accounts::ProducedBlocks))
                    .col(big_counter(Accounts::MissedBlocks))
                    .col(small_flag(Accounts::Virgin, 1))
                    .col(ColumnDef::new(Accounts::BlockId).text().null())
                    .to_owned(),
            )
            .await?;

        // Index for the orphan sweep and block-scoped lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_block_id")
                    .table(Accounts::Table)
                    .col(Accounts::BlockId)
                    .to_owned(),
            )
            .await?;

        // Delegate ranking scans order by vote
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_vote")
                    .table(Accounts::Table)
                    .col(Accounts::Vote)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Forks::Table)
                    .col(
                        ColumnDef::new(Forks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Forks::DelegatePublicKey).binary().not_null())
                    .col(ColumnDef::new(Forks::BlockId).text().not_null())
                    .col(ColumnDef::new(Forks::BlockHeight).big_integer().not_null())
                    .col(ColumnDef::new(Forks::PreviousBlockId).text().null())
                    .col(ColumnDef::new(Forks::BlockTimestamp).big_integer().not_null())
                    .col(ColumnDef::new(Forks::Cause).small_integer().not_null())
                    .col(
                        ColumnDef::new(Forks::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forks_delegate_public_key")
                    .table(Forks::Table)
                    .col(Forks::DelegatePublicKey)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Forks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Blocks::Table).to_owned())
            .await
    }
}

/// Smallint flag column with a fixed default
fn small_flag<T: IntoIden>(name: T, default: i16) -> ColumnDef {
    ColumnDef::new(name)
        .small_integer()
        .not_null()
        .default(default)
        .to_owned()
}

/// Bigint counter column defaulting to zero
fn big_counter<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(Iden)]
enum Blocks {
    Table,
    Id,
    Height,
    Timestamp,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Address,
    PublicKey,
    SecondPublicKey,
    Username,
    UUsername,
    IsDelegate,
    UIsDelegate,
    SecondSignature,
    USecondSignature,
    NameExist,
    UNameExist,
    Balance,
    UBalance,
    Vote,
    MultiMin,
    UMultiMin,
    MultiLifetime,
    UMultiLifetime,
    Fees,
    Rewards,
    ProducedBlocks,
    MissedBlocks,
    Virgin,
    BlockId,
}

#[derive(Iden)]
enum Forks {
    Table,
    Id,
    DelegatePublicKey,
    BlockId,
    BlockHeight,
    PreviousBlockId,
    BlockTimestamp,
    Cause,
    RecordedAt,
}
