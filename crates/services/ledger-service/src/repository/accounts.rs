//! Accounts repository.
//!
//! Translates structured arguments into single parameterized statements
//! over the `accounts` table and its satellite link tables. Field-level
//! access control (immutable fields, column whitelists) lives in the
//! declared column set; this module only assembles statements and picks
//! the right calling convention per operation (rows, one row, scalar,
//! affected count).

use async_trait::async_trait;
use sea_orm::sea_query::{
    Alias, DeleteStatement, Expr, ExprTrait, Func, InsertStatement, OnConflict, Query,
    SelectStatement, SimpleExpr, UpdateStatement,
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, JsonValue, Value,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use common::{AppError, AppResult};
use domain::{Account, DependencyKind};

use super::columns::{ColumnSet, ACCOUNTS, MIRRORED_COLUMNS};
use super::filters::{Filters, ListOptions};
use super::Record;

/// Identifying projection of an account whose block reference points at
/// no existing block.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct OrphanedAccount {
    pub address: String,
    pub block_id: Option<String>,
}

/// Accounts repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountsRepository: Send + Sync {
    /// List records matching `filters`, projecting `fields` (defaults to
    /// all declared fields; unknown names are silently dropped).
    async fn list(
        &self,
        filters: Filters,
        fields: Option<Vec<String>>,
        options: ListOptions,
    ) -> AppResult<Vec<JsonValue>>;

    /// Fetch one account by address with the full projection
    async fn get(&self, address: &str) -> AppResult<Option<Account>>;

    /// Count records matching `filters`
    async fn count(&self, filters: Filters) -> AppResult<u64>;

    /// Insert a new record; fields outside the insert set are ignored
    async fn insert(&self, record: Record) -> AppResult<()>;

    /// Update the record matching `address`; empty payload is a no-op
    async fn update(&self, address: &str, record: Record) -> AppResult<()>;

    /// Insert, or update on conflict, in one conflict-aware statement
    async fn upsert(
        &self,
        record: Record,
        conflict_fields: Vec<String>,
        update: Option<Record>,
    ) -> AppResult<()>;

    /// Atomically add `amount` to a whitelisted numeric column
    async fn increment(&self, address: &str, field: &str, amount: i64) -> AppResult<()>;

    /// Atomically subtract `amount` from a whitelisted numeric column
    async fn decrement(&self, address: &str, field: &str, amount: i64) -> AppResult<()>;

    /// Delete the record matching `address`; zero rows affected is not
    /// an error
    async fn remove(&self, address: &str) -> AppResult<u64>;

    /// Accounts whose block reference matches no existing block
    async fn get_orphaned(&self) -> AppResult<Vec<OrphanedAccount>>;

    /// Bulk-copy every unconfirmed shadow column onto its confirmed
    /// counterpart; idempotent
    async fn commit_unconfirmed(&self) -> AppResult<u64>;

    /// Add a row to the satellite table for `kind`
    async fn insert_dependency(
        &self,
        address: &str,
        dependent_id: &str,
        kind: DependencyKind,
    ) -> AppResult<()>;

    /// Remove a row from the satellite table for `kind`
    async fn remove_dependency(
        &self,
        address: &str,
        dependent_id: &str,
        kind: DependencyKind,
    ) -> AppResult<u64>;
}

// =============================================================================
// Statement builders
// =============================================================================
// Pure functions from arguments to statements; all argument-shape errors
// surface here, before anything reaches the store.

fn build_list(
    filters: &Filters,
    fields: Option<&[String]>,
    options: &ListOptions,
) -> AppResult<SelectStatement> {
    let mut select = Query::select();
    ACCOUNTS.apply_projection(&mut select, fields);
    select.from(ACCOUNTS.table());
    if !filters.is_empty() {
        select.cond_where(ACCOUNTS.condition(filters)?);
    }
    if let Some(fragment) = &options.raw_and {
        select.and_where(Expr::cust(fragment.clone()).into());
    }
    ACCOUNTS.apply_sort(&mut select, &options.sort)?;
    if let Some(limit) = options.limit {
        select.limit(limit);
    }
    if let Some(offset) = options.offset {
        select.offset(offset);
    }
    Ok(select)
}

fn build_get(address: &str) -> SelectStatement {
    let mut select = Query::select();
    ACCOUNTS.apply_projection(&mut select, None);
    select
        .from(ACCOUNTS.table())
        .and_where(Expr::col(Alias::new("address")).eq(address))
        .limit(1);
    select
}

fn build_count(filters: &Filters) -> AppResult<SelectStatement> {
    let mut select = Query::select();
    select
        .expr_as(
            Func::count(Expr::col(Alias::new("address"))),
            Alias::new("count"),
        )
        .from(ACCOUNTS.table());
    if !filters.is_empty() {
        select.cond_where(ACCOUNTS.condition(filters)?);
    }
    Ok(select)
}

fn build_insert(record: &Record) -> AppResult<InsertStatement> {
    let (columns, values) = ACCOUNTS.insert_values(record)?;
    let mut insert = Query::insert();
    insert.into_table(ACCOUNTS.table()).columns(columns);
    insert
        .values(values)
        .map_err(|e| AppError::internal(e.to_string()))?;
    Ok(insert)
}

fn build_update(address: &str, record: &Record) -> AppResult<Option<UpdateStatement>> {
    if address.is_empty() {
        return Err(AppError::InvalidKey);
    }
    let values = ACCOUNTS.update_values(record);
    if values.is_empty() {
        return Ok(None);
    }
    let mut update = Query::update();
    update.table(ACCOUNTS.table());
    for (column, expr) in values {
        update.value(column, expr);
    }
    update.and_where(Expr::col(Alias::new("address")).eq(address));
    Ok(Some(update))
}

fn build_upsert(
    record: &Record,
    conflict_fields: &[String],
    update: Option<&Record>,
) -> AppResult<InsertStatement> {
    if conflict_fields.is_empty() {
        return Err(AppError::invalid_argument("conflict fields must not be empty"));
    }
    ACCOUNTS.assert_writable(record)?;
    if let Some(update_record) = update {
        ACCOUNTS.assert_writable(update_record)?;
    }

    let mut conflict_columns = Vec::with_capacity(conflict_fields.len());
    for name in conflict_fields {
        let def = ACCOUNTS
            .field(name)
            .filter(|d| d.is_physical())
            .ok_or_else(|| AppError::unknown_field(name.clone()))?;
        conflict_columns.push(Alias::new(def.name));
    }

    let mut insert = build_insert(record)?;
    let update_values = ACCOUNTS.update_values(update.unwrap_or(record));
    let mut on_conflict = OnConflict::columns(conflict_columns);
    if update_values.is_empty() {
        on_conflict.do_nothing();
    } else {
        on_conflict.values(update_values);
    }
    insert.on_conflict(on_conflict);
    Ok(insert)
}

fn build_adjust(
    address: &str,
    field: &str,
    amount: i64,
    negate: bool,
) -> AppResult<UpdateStatement> {
    if address.is_empty() {
        return Err(AppError::InvalidKey);
    }
    let def = ACCOUNTS
        .field(field)
        .filter(|d| d.counter)
        .ok_or_else(|| AppError::unknown_field(field))?;
    let column = Alias::new(def.name);
    let delta = if negate {
        Expr::col(column.clone()).sub(amount)
    } else {
        Expr::col(column.clone()).add(amount)
    };
    let mut update = Query::update();
    update
        .table(ACCOUNTS.table())
        .value(column, delta)
        .and_where(Expr::col(Alias::new("address")).eq(address));
    Ok(update)
}

fn build_remove(address: &str) -> AppResult<DeleteStatement> {
    if address.is_empty() {
        return Err(AppError::InvalidKey);
    }
    let mut delete = Query::delete();
    delete
        .from_table(ACCOUNTS.table())
        .and_where(Expr::col(Alias::new("address")).eq(address));
    Ok(delete)
}

fn build_orphaned() -> SelectStatement {
    let accounts = Alias::new("accounts");
    let blocks = Alias::new("blocks");
    let mut select = Query::select();
    select
        .column((accounts.clone(), Alias::new("address")))
        .column((accounts.clone(), Alias::new("block_id")))
        .from(accounts.clone())
        .left_join(
            blocks.clone(),
            Expr::col((blocks.clone(), Alias::new("id")))
                .equals((accounts.clone(), Alias::new("block_id"))),
        )
        .and_where(Expr::col((accounts, Alias::new("block_id"))).is_not_null())
        .and_where(Expr::col((blocks, Alias::new("id"))).is_null());
    select
}

fn build_commit_unconfirmed() -> UpdateStatement {
    let mut update = Query::update();
    update.table(ACCOUNTS.table());
    for (confirmed, shadow) in MIRRORED_COLUMNS {
        update.value(Alias::new(*confirmed), ColumnSet::column_expr(shadow));
    }
    update
}

fn dependency_table(kind: DependencyKind) -> &'static str {
    match kind {
        DependencyKind::DelegateVotes => "account_votes",
        DependencyKind::UnconfirmedDelegateVotes => "account_votes_unconfirmed",
        DependencyKind::MultisigMembers => "account_multisig_members",
        DependencyKind::UnconfirmedMultisigMembers => "account_multisig_members_unconfirmed",
    }
}

fn build_dependency_insert(
    address: &str,
    dependent_id: &str,
    kind: DependencyKind,
) -> AppResult<InsertStatement> {
    if address.is_empty() {
        return Err(AppError::InvalidKey);
    }
    if dependent_id.is_empty() {
        return Err(AppError::invalid_argument("dependent id must not be empty"));
    }
    let values: Vec<SimpleExpr> = vec![
        Value::from(address).into(),
        Value::from(dependent_id).into(),
    ];
    let mut insert = Query::insert();
    insert
        .into_table(Alias::new(dependency_table(kind)))
        .columns([Alias::new("account_address"), Alias::new("dependent_id")]);
    insert
        .values(values)
        .map_err(|e| AppError::internal(e.to_string()))?;
    Ok(insert)
}

fn build_dependency_remove(
    address: &str,
    dependent_id: &str,
    kind: DependencyKind,
) -> AppResult<DeleteStatement> {
    if address.is_empty() {
        return Err(AppError::InvalidKey);
    }
    let mut delete = Query::delete();
    delete
        .from_table(Alias::new(dependency_table(kind)))
        .and_where(Expr::col(Alias::new("account_address")).eq(address))
        .and_where(Expr::col(Alias::new("dependent_id")).eq(dependent_id));
    Ok(delete)
}

// =============================================================================
// Store
// =============================================================================

/// Concrete implementation of [`AccountsRepository`] over a relational
/// connection.
pub struct AccountsStore {
    db: DatabaseConnection,
}

impl AccountsStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }
}

#[async_trait]
impl AccountsRepository for AccountsStore {
    async fn list(
        &self,
        filters: Filters,
        fields: Option<Vec<String>>,
        options: ListOptions,
    ) -> AppResult<Vec<JsonValue>> {
        let select = build_list(&filters, fields.as_deref(), &options)?;
        let stmt = self.backend().build(&select);
        JsonValue::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get(&self, address: &str) -> AppResult<Option<Account>> {
        let stmt = self.backend().build(&build_get(address));
        let row = JsonValue::find_by_statement(stmt).one(&self.db).await?;
        match row {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| AppError::internal(format!("account row decode failed: {}", e))),
            None => Ok(None),
        }
    }

    async fn count(&self, filters: Filters) -> AppResult<u64> {
        let stmt = self.backend().build(&build_count(&filters)?);
        let row = self
            .db
            .query_one(stmt)
            .await?
            .ok_or_else(|| AppError::internal("count query returned no row"))?;
        let count: i64 = row.try_get_by("count")?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, record: Record) -> AppResult<()> {
        let stmt = self.backend().build(&build_insert(&record)?);
        self.db.execute(stmt).await?;
        Ok(())
    }

    async fn update(&self, address: &str, record: Record) -> AppResult<()> {
        match build_update(address, &record)? {
            Some(update) => {
                let stmt = self.backend().build(&update);
                self.db.execute(stmt).await?;
                Ok(())
            }
            // Empty payload updates nothing and succeeds
            None => Ok(()),
        }
    }

    async fn upsert(
        &self,
        record: Record,
        conflict_fields: Vec<String>,
        update: Option<Record>,
    ) -> AppResult<()> {
        let insert = build_upsert(&record, &conflict_fields, update.as_ref())?;
        let stmt = self.backend().build(&insert);
        self.db.execute(stmt).await?;
        Ok(())
    }

    async fn increment(&self, address: &str, field: &str, amount: i64) -> AppResult<()> {
        let stmt = self.backend().build(&build_adjust(address, field, amount, false)?);
        self.db.execute(stmt).await?;
        Ok(())
    }

    async fn decrement(&self, address: &str, field: &str, amount: i64) -> AppResult<()> {
        let stmt = self.backend().build(&build_adjust(address, field, amount, true)?);
        self.db.execute(stmt).await?;
        Ok(())
    }

    async fn remove(&self, address: &str) -> AppResult<u64> {
        let stmt = self.backend().build(&build_remove(address)?);
        let result = self.db.execute(stmt).await?;
        Ok(result.rows_affected())
    }

    async fn get_orphaned(&self) -> AppResult<Vec<OrphanedAccount>> {
        let stmt = self.backend().build(&build_orphaned());
        OrphanedAccount::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn commit_unconfirmed(&self) -> AppResult<u64> {
        let stmt = self.backend().build(&build_commit_unconfirmed());
        let result = self.db.execute(stmt).await?;
        Ok(result.rows_affected())
    }

    async fn insert_dependency(
        &self,
        address: &str,
        dependent_id: &str,
        kind: DependencyKind,
    ) -> AppResult<()> {
        let stmt = self
            .backend()
            .build(&build_dependency_insert(address, dependent_id, kind)?);
        self.db.execute(stmt).await?;
        Ok(())
    }

    async fn remove_dependency(
        &self,
        address: &str,
        dependent_id: &str,
        kind: DependencyKind,
    ) -> AppResult<u64> {
        let stmt = self
            .backend()
            .build(&build_dependency_remove(address, dependent_id, kind)?);
        let result = self.db.execute(stmt).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::filters::SortKey;
    use sea_orm::sea_query::PostgresQueryBuilder;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_list_combines_projection_filter_sort_and_pagination() {
        let filters = Filters::new().eq("address", "123L");
        let fields = vec!["balance".to_string()];
        let options = ListOptions::new()
            .sort_by(SortKey::desc("balance"))
            .limit(10)
            .offset(5);
        let sql = build_list(&filters, Some(&fields), &options)
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.starts_with("SELECT \"balance\" FROM \"accounts\""));
        assert!(sql.contains("\"address\" = '123L'"));
        assert!(sql.contains("ORDER BY \"balance\" DESC"));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 5"));
    }

    #[test]
    fn test_list_appends_raw_fragment_with_and_semantics() {
        let filters = Filters::new().eq("is_delegate", 1i16);
        let options = ListOptions::new().raw_and("\"balance\" > 0");
        let sql = build_list(&filters, None, &options)
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.contains("\"is_delegate\" = 1"));
        assert!(sql.contains("AND"));
        assert!(sql.contains("\"balance\" > 0"));
    }

    #[test]
    fn test_list_rejects_unknown_filter_field() {
        let filters = Filters::new().eq("sats", 1i64);
        let err = build_list(&filters, None, &ListOptions::new()).unwrap_err();
        assert!(matches!(err, AppError::UnknownField(field) if field == "sats"));
    }

    #[test]
    fn test_list_rejects_unknown_sort_field() {
        let options = ListOptions::new().sort_by(SortKey::asc("sats"));
        let err = build_list(&Filters::new(), None, &options).unwrap_err();
        assert!(matches!(err, AppError::UnknownColumn(column) if column == "sats"));
    }

    #[test]
    fn test_insert_writes_declared_columns_only() {
        let rec = record(&[
            ("address", Value::from("123L")),
            ("balance", Value::from(15_000i64)),
            ("extraneous", Value::from("ignored")),
        ]);
        let sql = build_insert(&rec).unwrap().to_string(PostgresQueryBuilder);
        assert_eq!(
            sql,
            "INSERT INTO \"accounts\" (\"address\", \"balance\") VALUES ('123L', 15000)"
        );
    }

    #[test]
    fn test_insert_decodes_hex_columns() {
        let rec = record(&[
            ("address", Value::from("123L")),
            ("public_key", Value::from("aabbcc")),
        ]);
        let sql = build_insert(&rec).unwrap().to_string(PostgresQueryBuilder);
        assert!(sql.contains("decode('aabbcc', 'hex')"));
    }

    #[test]
    fn test_insert_requires_address() {
        let rec = record(&[("balance", Value::from(1i64))]);
        assert!(matches!(
            build_insert(&rec),
            Err(AppError::Validation(msg)) if msg.contains("address")
        ));
    }

    #[test]
    fn test_update_empty_payload_is_a_noop() {
        assert!(build_update("123L", &Record::new()).unwrap().is_none());
    }

    #[test]
    fn test_update_rejects_empty_key() {
        let rec = record(&[("balance", Value::from(1i64))]);
        assert!(matches!(build_update("", &rec), Err(AppError::InvalidKey)));
    }

    #[test]
    fn test_update_never_writes_immutable_fields() {
        let rec = record(&[
            ("address", Value::from("999L")),
            ("virgin", Value::from(0i16)),
            ("balance", Value::from(42i64)),
        ]);
        let sql = build_update("123L", &rec)
            .unwrap()
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert_eq!(
            sql,
            "UPDATE \"accounts\" SET \"balance\" = 42 WHERE \"address\" = '123L'"
        );
    }

    #[test]
    fn test_upsert_requires_conflict_fields() {
        let rec = record(&[("address", Value::from("123L"))]);
        assert!(matches!(
            build_upsert(&rec, &[], None),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_upsert_rejects_fields_outside_the_column_set() {
        let rec = record(&[
            ("address", Value::from("123L")),
            ("sats", Value::from(1i64)),
        ]);
        assert!(matches!(
            build_upsert(&rec, &["address".to_string()], None),
            Err(AppError::InvalidArgument(msg)) if msg.contains("sats")
        ));
    }

    #[test]
    fn test_upsert_emits_single_conflict_aware_statement() {
        let rec = record(&[
            ("address", Value::from("123L")),
            ("balance", Value::from(16_000i64)),
        ]);
        let sql = build_upsert(&rec, &["address".to_string()], None)
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.contains("ON CONFLICT (\"address\") DO UPDATE SET \"balance\" = 16000"));
    }

    #[test]
    fn test_upsert_with_only_immutable_updates_degrades_to_do_nothing() {
        let rec = record(&[
            ("address", Value::from("123L")),
            ("virgin", Value::from(1i16)),
        ]);
        let sql = build_upsert(&rec, &["address".to_string()], None)
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.contains("ON CONFLICT (\"address\") DO NOTHING"));
    }

    #[test]
    fn test_increment_adds_to_whitelisted_counter() {
        let sql = build_adjust("123L", "balance", 1_000, false)
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert_eq!(
            sql,
            "UPDATE \"accounts\" SET \"balance\" = \"balance\" + 1000 WHERE \"address\" = '123L'"
        );
    }

    #[test]
    fn test_decrement_subtracts_from_whitelisted_counter() {
        let sql = build_adjust("123L", "balance", 1_000, true)
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.contains("\"balance\" = \"balance\" - 1000"));
    }

    #[test]
    fn test_adjust_rejects_non_counter_fields() {
        assert!(matches!(
            build_adjust("123L", "username", 1, false),
            Err(AppError::UnknownField(field)) if field == "username"
        ));
        assert!(matches!(
            build_adjust("123L", "sats", 1, false),
            Err(AppError::UnknownField(_))
        ));
    }

    #[test]
    fn test_remove_deletes_by_key() {
        let sql = build_remove("123L").unwrap().to_string(PostgresQueryBuilder);
        assert_eq!(sql, "DELETE FROM \"accounts\" WHERE \"address\" = '123L'");
    }

    #[test]
    fn test_orphaned_projects_identifying_fields_via_left_join() {
        let sql = build_orphaned().to_string(PostgresQueryBuilder);
        assert!(sql.contains("\"accounts\".\"address\""));
        assert!(sql.contains("\"accounts\".\"block_id\""));
        assert!(sql.contains("LEFT JOIN \"blocks\""));
        assert!(sql.contains("IS NOT NULL"));
        assert!(sql.contains("\"blocks\".\"id\" IS NULL"));
    }

    #[test]
    fn test_commit_unconfirmed_copies_every_shadow_pair() {
        let sql = build_commit_unconfirmed().to_string(PostgresQueryBuilder);
        for (confirmed, shadow) in MIRRORED_COLUMNS {
            assert!(
                sql.contains(&format!("\"{}\" = \"{}\"", confirmed, shadow)),
                "missing pair {} <- {}",
                confirmed,
                shadow
            );
        }
    }

    #[test]
    fn test_dependency_statements_target_the_whitelisted_table() {
        let sql = build_dependency_insert("123L", "456L", DependencyKind::DelegateVotes)
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert_eq!(
            sql,
            "INSERT INTO \"account_votes\" (\"account_address\", \"dependent_id\") VALUES ('123L', '456L')"
        );

        let sql = build_dependency_remove("123L", "456L", DependencyKind::UnconfirmedMultisigMembers)
            .unwrap()
            .to_string(PostgresQueryBuilder);
        assert!(sql.starts_with("DELETE FROM \"account_multisig_members_unconfirmed\""));
        assert!(sql.contains("\"account_address\" = '123L'"));
        assert!(sql.contains("\"dependent_id\" = '456L'"));
    }

    #[test]
    fn test_dependency_table_covers_every_kind() {
        let tables: std::collections::HashSet<_> =
            DependencyKind::ALL.iter().map(|k| dependency_table(*k)).collect();
        assert_eq!(tables.len(), DependencyKind::ALL.len());
    }
}
