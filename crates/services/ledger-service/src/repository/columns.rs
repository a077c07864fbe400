//! Declarative column sets.
//!
//! Each repository declares its fields once, as data: an ordered list of
//! field descriptors with their storage source, mutability, and render
//! rules. Every per-field decision (projection, filter predicate, sort
//! key, membership in an insert/update set) is a lookup into that table.
//! The whitelist is the layer's defense against injection and against
//! silently diverging schema mirrors.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use sea_orm::sea_query::{
    Alias, Condition, Expr, ExprTrait, IntoColumnRef, Order, SelectStatement, SimpleExpr,
};
use sea_orm::Value;

use common::{AppError, AppResult};

use super::filters::{Filter, Filters, SortDirection, SortKey};
use super::Record;

/// Where a logical field's data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Physical column stored under the field's own name
    Column,
    /// Physical bytea column, rendered as lowercase hex text on read and
    /// decoded from hex text on write
    HexColumn,
    /// Computed projection (window ranking, correlated aggregation);
    /// select-only
    Computed(&'static str),
}

/// One field descriptor in a column set.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub source: FieldSource,
    /// Never written by update/upsert after creation
    pub immutable: bool,
    /// Numeric column eligible for increment/decrement
    pub counter: bool,
}

impl FieldDef {
    const fn column(name: &'static str) -> Self {
        Self {
            name,
            source: FieldSource::Column,
            immutable: false,
            counter: false,
        }
    }

    const fn hex(name: &'static str) -> Self {
        Self {
            name,
            source: FieldSource::HexColumn,
            immutable: false,
            counter: false,
        }
    }

    const fn computed(name: &'static str, expr: &'static str) -> Self {
        Self {
            name,
            source: FieldSource::Computed(expr),
            immutable: false,
            counter: false,
        }
    }

    const fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    const fn counter(mut self) -> Self {
        self.counter = true;
        self
    }

    /// Backed by a real column (filterable, sortable, writable)
    pub fn is_physical(&self) -> bool {
        matches!(self.source, FieldSource::Column | FieldSource::HexColumn)
    }

    /// Expression this field is compared against in predicates
    fn comparable(&self) -> Expr {
        match self.source {
            FieldSource::Column => Expr::col(Alias::new(self.name)),
            FieldSource::HexColumn => {
                Expr::expr(Expr::cust(format!("encode(\"{}\", 'hex')", self.name)))
            }
            // Callers reject computed fields before building predicates
            FieldSource::Computed(expr) => Expr::expr(Expr::cust(expr)),
        }
    }

    /// Expression written for this field in insert/update sets
    fn write_expr(&self, value: Value) -> SimpleExpr {
        match self.source {
            FieldSource::HexColumn => Expr::cust_with_values("decode(?, 'hex')", [value]).into(),
            _ => value.into(),
        }
    }
}

/// A declared set of fields for one logical table.
pub struct ColumnSet {
    table: &'static str,
    /// Field required on insert (the record key), if any
    required: Option<&'static str>,
    fields: &'static [FieldDef],
    index: Lazy<HashMap<&'static str, &'static FieldDef>>,
}

impl ColumnSet {
    pub fn table(&self) -> Alias {
        Alias::new(self.table)
    }

    /// Look up a field descriptor by logical name
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.index.get(name).copied()
    }

    /// Add the requested fields to a select, defaulting to the full set.
    ///
    /// Unknown requested names are silently dropped; if nothing requested
    /// survives, the full set is projected instead.
    pub fn apply_projection(&self, select: &mut SelectStatement, requested: Option<&[String]>) {
        let picked: Vec<&FieldDef> = match requested {
            Some(names) => {
                let known: Vec<&FieldDef> =
                    names.iter().filter_map(|n| self.field(n)).collect();
                if known.is_empty() {
                    self.fields.iter().collect()
                } else {
                    known
                }
            }
            None => self.fields.iter().collect(),
        };

        for def in picked {
            match def.source {
                FieldSource::Column => {
                    select.column(Alias::new(def.name));
                }
                FieldSource::HexColumn => {
                    select.expr_as(
                        Expr::cust(format!("encode(\"{}\", 'hex')", def.name)),
                        Alias::new(def.name),
                    );
                }
                FieldSource::Computed(expr) => {
                    select.expr_as(Expr::cust(expr), Alias::new(def.name));
                }
            }
        }
    }

    /// Translate a filter mapping into an AND-composed predicate.
    ///
    /// Unknown or computed fields are rejected before any statement is
    /// built.
    pub fn condition(&self, filters: &Filters) -> AppResult<Condition> {
        let mut condition = Condition::all();
        for (name, filter) in filters.iter() {
            let def = self
                .field(name)
                .filter(|d| d.is_physical())
                .ok_or_else(|| AppError::unknown_field(name.clone()))?;
            let lhs = def.comparable();
            let predicate: SimpleExpr = match filter {
                Filter::Eq(value) => lhs.eq(value.clone()),
                Filter::Ne(value) => lhs.ne(value.clone()),
                Filter::Like(pattern) => lhs.like(pattern.as_str()),
                Filter::In(values) => lhs.is_in(values.iter().cloned()),
                Filter::Gt(value) => lhs.gt(value.clone()),
                Filter::Lt(value) => lhs.lt(value.clone()),
            };
            condition = condition.add(predicate);
        }
        Ok(condition)
    }

    /// Apply composite sort keys; unknown fields fail the whole call.
    pub fn apply_sort(&self, select: &mut SelectStatement, sort: &[SortKey]) -> AppResult<()> {
        for key in sort {
            let def = self
                .field(&key.field)
                .filter(|d| d.is_physical())
                .ok_or_else(|| AppError::unknown_column(key.field.clone()))?;
            let order = match key.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            select.order_by(Alias::new(def.name), order);
        }
        Ok(())
    }

    /// Project a record onto the insert column subset, in declaration
    /// order. Unknown record fields are ignored; absent columns take
    /// their declared storage defaults.
    pub fn insert_values(&self, record: &Record) -> AppResult<(Vec<Alias>, Vec<SimpleExpr>)> {
        if let Some(required) = self.required {
            if !record.contains_key(required) {
                return Err(AppError::validation(format!(
                    "missing required field: {}",
                    required
                )));
            }
        }

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for def in self.fields.iter().filter(|d| d.is_physical()) {
            if let Some(value) = record.get(def.name) {
                columns.push(Alias::new(def.name));
                values.push(def.write_expr(value.clone()));
            }
        }
        Ok((columns, values))
    }

    /// Project a record onto the update column subset.
    ///
    /// Immutable fields never enter the generated set, even when present
    /// in the payload; unknown fields are ignored.
    pub fn update_values(&self, record: &Record) -> Vec<(Alias, SimpleExpr)> {
        self.fields
            .iter()
            .filter(|d| d.is_physical() && !d.immutable)
            .filter_map(|def| {
                record
                    .get(def.name)
                    .map(|value| (Alias::new(def.name), def.write_expr(value.clone())))
            })
            .collect()
    }

    /// Strict whitelist check used by the upsert path: every record field
    /// must name a physical column.
    pub fn assert_writable(&self, record: &Record) -> AppResult<()> {
        for name in record.keys() {
            match self.field(name) {
                Some(def) if def.is_physical() => {}
                _ => {
                    return Err(AppError::invalid_argument(format!(
                        "field outside the column set: {}",
                        name
                    )))
                }
            }
        }
        Ok(())
    }

    /// Column expression qualified for a predicate, for internal use by
    /// statement builders needing one known column.
    pub fn column_expr(name: &str) -> SimpleExpr {
        SimpleExpr::Column(Alias::new(name).into_column_ref())
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// Shadow column pairs, reconciled confirmed ← unconfirmed by the bulk
/// maintenance operation.
pub const MIRRORED_COLUMNS: &[(&str, &str)] = &[
    ("balance", "u_balance"),
    ("is_delegate", "u_is_delegate"),
    ("second_signature", "u_second_signature"),
    ("username", "u_username"),
    ("name_exist", "u_name_exist"),
    ("multi_min", "u_multi_min"),
    ("multi_lifetime", "u_multi_lifetime"),
];

const RANK_EXPR: &str = "(SELECT d.rank FROM (SELECT row_number() OVER (ORDER BY \"vote\" DESC, \"public_key\" ASC) AS rank, \"address\" FROM \"accounts\" WHERE \"is_delegate\" = 1) d WHERE d.\"address\" = \"accounts\".\"address\")";

const DELEGATES_EXPR: &str = "(SELECT json_agg(\"dependent_id\") FROM \"account_votes\" WHERE \"account_address\" = \"accounts\".\"address\")";
const U_DELEGATES_EXPR: &str = "(SELECT json_agg(\"dependent_id\") FROM \"account_votes_unconfirmed\" WHERE \"account_address\" = \"accounts\".\"address\")";
const MULTISIG_EXPR: &str = "(SELECT json_agg(\"dependent_id\") FROM \"account_multisig_members\" WHERE \"account_address\" = \"accounts\".\"address\")";
const U_MULTISIG_EXPR: &str = "(SELECT json_agg(\"dependent_id\") FROM \"account_multisig_members_unconfirmed\" WHERE \"account_address\" = \"accounts\".\"address\")";

static ACCOUNT_FIELDS: &[FieldDef] = &[
    FieldDef::column("address").immutable(),
    FieldDef::hex("public_key"),
    FieldDef::hex("second_public_key"),
    FieldDef::column("username"),
    FieldDef::column("u_username"),
    FieldDef::column("is_delegate"),
    FieldDef::column("u_is_delegate"),
    FieldDef::column("second_signature"),
    FieldDef::column("u_second_signature"),
    FieldDef::column("name_exist"),
    FieldDef::column("u_name_exist"),
    FieldDef::column("balance").counter(),
    FieldDef::column("u_balance").counter(),
    FieldDef::column("vote").counter(),
    FieldDef::column("multi_min"),
    FieldDef::column("u_multi_min"),
    FieldDef::column("multi_lifetime"),
    FieldDef::column("u_multi_lifetime"),
    FieldDef::column("fees").counter(),
    FieldDef::column("rewards").counter(),
    FieldDef::column("produced_blocks").counter(),
    FieldDef::column("missed_blocks").counter(),
    FieldDef::column("virgin").immutable(),
    FieldDef::column("block_id"),
    FieldDef::computed("rank", RANK_EXPR),
    FieldDef::computed("delegates", DELEGATES_EXPR),
    FieldDef::computed("u_delegates", U_DELEGATES_EXPR),
    FieldDef::computed("multisignatures", MULTISIG_EXPR),
    FieldDef::computed("u_multisignatures", U_MULTISIG_EXPR),
];

fn account_index() -> HashMap<&'static str, &'static FieldDef> {
    ACCOUNT_FIELDS.iter().map(|def| (def.name, def)).collect()
}

/// The accounts column set.
pub static ACCOUNTS: ColumnSet = ColumnSet {
    table: "accounts",
    required: Some("address"),
    fields: ACCOUNT_FIELDS,
    index: Lazy::new(account_index),
};

// =============================================================================
// Forks
// =============================================================================

static FORK_FIELDS: &[FieldDef] = &[
    FieldDef::hex("delegate_public_key"),
    FieldDef::column("block_id"),
    FieldDef::column("block_height"),
    FieldDef::column("previous_block_id"),
    FieldDef::column("block_timestamp"),
    FieldDef::column("cause"),
    FieldDef::column("recorded_at"),
];

fn fork_index() -> HashMap<&'static str, &'static FieldDef> {
    FORK_FIELDS.iter().map(|def| (def.name, def)).collect()
}

/// The forks column set (insert-only audit table).
pub static FORKS: ColumnSet = ColumnSet {
    table: "forks",
    required: Some("block_id"),
    fields: FORK_FIELDS,
    index: Lazy::new(fork_index),
};

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Iden, PostgresQueryBuilder, Query};

    fn select_sql(requested: Option<&[String]>) -> String {
        let mut select = Query::select();
        ACCOUNTS.apply_projection(&mut select, requested);
        select.from(ACCOUNTS.table());
        select.to_string(PostgresQueryBuilder)
    }

    #[test]
    fn test_projection_defaults_to_all_declared_fields() {
        let sql = select_sql(None);
        assert!(sql.contains("\"address\""));
        assert!(sql.contains("\"u_balance\""));
        assert!(sql.contains("encode(\"public_key\", 'hex')"));
        assert!(sql.contains("row_number() OVER"));
        assert!(sql.contains("json_agg(\"dependent_id\")"));
    }

    #[test]
    fn test_projection_silently_drops_unknown_fields() {
        let requested = vec!["balance".to_string(), "sats".to_string()];
        let sql = select_sql(Some(&requested));
        assert!(sql.contains("\"balance\""));
        assert!(!sql.contains("sats"));
    }

    #[test]
    fn test_projection_with_no_known_fields_falls_back_to_full_set() {
        let requested = vec!["sats".to_string()];
        let sql = select_sql(Some(&requested));
        assert!(sql.contains("\"address\""));
        assert!(!sql.contains("sats"));
    }

    #[test]
    fn test_condition_rejects_unknown_filter_field() {
        let filters = Filters::new().eq("sats", 1i64);
        let err = ACCOUNTS.condition(&filters).unwrap_err();
        assert!(matches!(err, AppError::UnknownField(field) if field == "sats"));
    }

    #[test]
    fn test_condition_rejects_computed_filter_field() {
        let filters = Filters::new().eq("rank", 1i64);
        assert!(matches!(
            ACCOUNTS.condition(&filters),
            Err(AppError::UnknownField(_))
        ));
    }

    #[test]
    fn test_condition_translates_operators() {
        let filters = Filters::new()
            .eq("address", "123L")
            .like("username", "gen%")
            .any("block_id", ["b1", "b2"]);
        let mut select = Query::select();
        select
            .column(Alias::new("address"))
            .from(ACCOUNTS.table())
            .cond_where(ACCOUNTS.condition(&filters).unwrap());
        let sql = select.to_string(PostgresQueryBuilder);
        assert!(sql.contains("\"address\" = '123L'"));
        assert!(sql.contains("\"username\" LIKE 'gen%'"));
        assert!(sql.contains("\"block_id\" IN ('b1', 'b2')"));
    }

    #[test]
    fn test_hex_field_filters_compare_against_encoded_text() {
        let filters = Filters::new().eq("public_key", "aabb");
        let mut select = Query::select();
        select
            .column(Alias::new("address"))
            .from(ACCOUNTS.table())
            .cond_where(ACCOUNTS.condition(&filters).unwrap());
        let sql = select.to_string(PostgresQueryBuilder);
        assert!(sql.contains("encode(\"public_key\", 'hex') = 'aabb'"));
    }

    #[test]
    fn test_sort_rejects_unknown_column() {
        let mut select = Query::select();
        let err = ACCOUNTS
            .apply_sort(&mut select, &[SortKey::asc("sats")])
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownColumn(column) if column == "sats"));
    }

    #[test]
    fn test_sort_applies_composite_keys_in_order() {
        let mut select = Query::select();
        select.column(Alias::new("address")).from(ACCOUNTS.table());
        ACCOUNTS
            .apply_sort(
                &mut select,
                &[SortKey::desc("balance"), SortKey::asc("address")],
            )
            .unwrap();
        let sql = select.to_string(PostgresQueryBuilder);
        assert!(sql.contains("ORDER BY \"balance\" DESC, \"address\" ASC"));
    }

    #[test]
    fn test_insert_values_requires_the_record_key() {
        let record = Record::from([("balance".to_string(), Value::from(10i64))]);
        let err = ACCOUNTS.insert_values(&record).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("address")));
    }

    #[test]
    fn test_insert_values_ignores_unknown_fields() {
        let record = Record::from([
            ("address".to_string(), Value::from("123L")),
            ("sats".to_string(), Value::from(1i64)),
        ]);
        let (columns, values) = ACCOUNTS.insert_values(&record).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_update_values_exclude_immutable_fields() {
        let record = Record::from([
            ("address".to_string(), Value::from("123L")),
            ("virgin".to_string(), Value::from(0i16)),
            ("balance".to_string(), Value::from(42i64)),
        ]);
        let values = ACCOUNTS.update_values(&record);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].0.to_string(), "balance");
    }

    #[test]
    fn test_assert_writable_rejects_out_of_set_fields() {
        let record = Record::from([("rank".to_string(), Value::from(1i64))]);
        assert!(matches!(
            ACCOUNTS.assert_writable(&record),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_counter_whitelist_covers_numeric_columns_only() {
        assert!(ACCOUNTS.field("balance").unwrap().counter);
        assert!(ACCOUNTS.field("missed_blocks").unwrap().counter);
        assert!(!ACCOUNTS.field("username").unwrap().counter);
        assert!(!ACCOUNTS.field("address").unwrap().counter);
    }

    #[test]
    fn test_mirrored_pairs_reference_declared_columns() {
        for (confirmed, shadow) in MIRRORED_COLUMNS {
            assert!(ACCOUNTS.field(confirmed).is_some(), "{}", confirmed);
            assert!(ACCOUNTS.field(shadow).is_some(), "{}", shadow);
        }
    }
}
