//! Fork store integration tests.

use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

use domain::{Fork, ForkCause};
use ledger_service_lib::repository::{ForkStore, ForksRepository};

fn sample_fork() -> Fork {
    Fork::new(
        "aabbcc".to_string(),
        "block-7".to_string(),
        7,
        Some("block-6".to_string()),
        9_000,
        ForkCause::DivergentPreviousBlock,
    )
}

#[tokio::test]
async fn test_insert_writes_one_audit_row() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 1,
            rows_affected: 1,
        }])
        .into_connection();
    let store = ForkStore::new(db.clone());

    store.insert(sample_fork()).await.unwrap();

    let log = db.into_transaction_log();
    assert_eq!(log.len(), 1);
    let dump = format!("{:?}", log);
    assert!(dump.contains("forks"));
    assert!(dump.contains("decode"));
}

#[tokio::test]
async fn test_insert_rejects_incomplete_fork_before_touching_the_store() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let store = ForkStore::new(db.clone());

    let mut fork = sample_fork();
    fork.block_id = String::new();
    assert!(store.insert(fork).await.is_err());
    assert!(db.into_transaction_log().is_empty());
}
