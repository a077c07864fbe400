//! Structured filters and list options for repository queries.
//!
//! Callers describe predicates as data; translation into SQL happens in
//! the column set, which is the only place allowed to name physical
//! columns.

use std::collections::BTreeMap;

use sea_orm::Value;

/// A single filter operator applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Case-sensitive equality
    Eq(Value),
    /// Inequality
    Ne(Value),
    /// SQL LIKE pattern match
    Like(String),
    /// Membership in a value list (IN)
    In(Vec<Value>),
    /// Strictly greater than
    Gt(Value),
    /// Strictly less than
    Lt(Value),
}

/// An AND-composed mapping of field name to filter operator.
///
/// Field names are validated against the column set at translation time;
/// a later operator on the same field replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filters(BTreeMap<String, Filter>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), Filter::Eq(value.into()));
        self
    }

    pub fn ne(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), Filter::Ne(value.into()));
        self
    }

    /// Pattern match, e.g. `like("username", "gen%")`
    pub fn like(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.0.insert(field.into(), Filter::Like(pattern.into()));
        self
    }

    /// Membership filter (IN)
    pub fn any<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.0.insert(
            field.into(),
            Filter::In(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn gt(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), Filter::Gt(value.into()));
        self
    }

    pub fn lt(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), Filter::Lt(value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Filter)> {
        self.0.iter()
    }
}

/// Sort direction for a single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key; lists may carry several for composite ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Options applied to list queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListOptions {
    /// Composite sort keys, applied in order
    pub sort: Vec<SortKey>,
    /// Omitted limit returns all matching rows
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Escape hatch: raw predicate fragment appended with AND semantics.
    /// The fragment is trusted; never interpolate caller input into it.
    pub raw_and: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn raw_and(mut self, fragment: impl Into<String>) -> Self {
        self.raw_and = Some(fragment.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_operator_replaces_earlier_on_same_field() {
        let filters = Filters::new().eq("balance", 1i64).gt("balance", 5i64);
        let collected: Vec<_> = filters.iter().collect();
        assert_eq!(collected.len(), 1);
        assert!(matches!(collected[0].1, Filter::Gt(_)));
    }

    #[test]
    fn test_any_collects_membership_values() {
        let filters = Filters::new().any("address", ["1L", "2L"]);
        let (_, filter) = filters.iter().next().unwrap();
        match filter {
            Filter::In(values) => assert_eq!(values.len(), 2),
            other => panic!("expected membership filter, got {:?}", other),
        }
    }

    #[test]
    fn test_list_options_builder() {
        let options = ListOptions::new()
            .sort_by(SortKey::desc("balance"))
            .sort_by(SortKey::asc("address"))
            .limit(10)
            .offset(20);
        assert_eq!(options.sort.len(), 2);
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.offset, Some(20));
    }
}
