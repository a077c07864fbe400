//! Migration: Create the account dependency (satellite) tables.
//!
//! One table per whitelisted dependency kind, all sharing the same
//! composite-keyed shape: (account_address, dependent_id).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Satellite tables, one per dependency kind
const LINK_TABLES: &[&str] = &[
    "account_votes",
    "account_votes_unconfirmed",
    "account_multisig_members",
    "account_multisig_members_unconfirmed",
];

const ACCOUNT_ADDRESS: &str = "account_address";
const DEPENDENT_ID: &str = "dependent_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in LINK_TABLES {
            manager
                .create_table(
                    Table::create()
                        .table(Alias::new(*table))
                        .col(ColumnDef::new(Alias::new(ACCOUNT_ADDRESS)).text().not_null())
                        .col(ColumnDef::new(Alias::new(DEPENDENT_ID)).text().not_null())
                        .primary_key(
                            Index::create()
                                .col(Alias::new(ACCOUNT_ADDRESS))
                                .col(Alias::new(DEPENDENT_ID)),
                        )
                        .to_owned(),
                )
                .await?;

            // Owner-side lookups drive the aggregation subqueries
            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{}_account_address", table))
                        .table(Alias::new(*table))
                        .col(Alias::new(ACCOUNT_ADDRESS))
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in LINK_TABLES.iter().rev() {
            manager
                .drop_table(Table::drop().table(Alias::new(*table)).to_owned())
                .await?;
        }

        Ok(())
    }
}
