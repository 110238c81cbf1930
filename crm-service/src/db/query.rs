//! Typed SQL statement builders.
//!
//! Repos describe operations against these builders instead of
//! concatenating SQL, so tenant scoping in [`super::scope`] can merge its
//! constraint into any operation shape structurally. Column names are
//! `&'static str` supplied by repo code, never request input.

use chrono::{DateTime, Utc};
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use uuid::Uuid;

/// A bindable SQL value. Nulls stay typed so Postgres parameter inference
/// works for nullable columns.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Uuid(Option<Uuid>),
    Text(Option<String>),
    Int(Option<i64>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
    Json(Option<serde_json::Value>),
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(Some(v))
    }
}

impl From<Option<Uuid>> for SqlValue {
    fn from(v: Option<Uuid>) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(Some(v))
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for SqlValue {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(Some(v))
    }
}

impl From<Option<serde_json::Value>> for SqlValue {
    fn from(v: Option<serde_json::Value>) -> Self {
        SqlValue::Json(v)
    }
}

pub(crate) fn bind_value(
    query: sqlx::query::Query<'_, Postgres, PgArguments>,
    value: SqlValue,
) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    match value {
        SqlValue::Uuid(v) => query.bind(v),
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Int(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Timestamp(v) => query.bind(v),
        SqlValue::Json(v) => query.bind(v),
    }
}

pub(crate) fn bind_value_as<T>(
    query: sqlx::query::QueryAs<'_, Postgres, T, PgArguments>,
    value: SqlValue,
) -> sqlx::query::QueryAs<'_, Postgres, T, PgArguments> {
    match value {
        SqlValue::Uuid(v) => query.bind(v),
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Int(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Timestamp(v) => query.bind(v),
        SqlValue::Json(v) => query.bind(v),
    }
}

#[derive(Debug, Clone)]
enum Cond {
    Eq(&'static str, SqlValue),
    Gte(&'static str, SqlValue),
    Lte(&'static str, SqlValue),
    ILike(&'static str, String),
}

/// Conjunction of column constraints. Adding a condition never removes an
/// existing one, so a scoping constraint merged in later cannot displace
/// what the caller specified.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    conds: Vec<Cond>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.conds.push(Cond::Eq(column, value.into()));
        self
    }

    pub fn eq_opt<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub fn gte(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.conds.push(Cond::Gte(column, value.into()));
        self
    }

    pub fn gte_opt<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.gte(column, v),
            None => self,
        }
    }

    pub fn lte(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.conds.push(Cond::Lte(column, value.into()));
        self
    }

    pub fn lte_opt<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.lte(column, v),
            None => self,
        }
    }

    pub fn ilike(mut self, column: &'static str, pattern: impl Into<String>) -> Self {
        self.conds.push(Cond::ILike(column, pattern.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conds.is_empty()
    }

    /// Whether any condition constrains `column`.
    pub fn constrains(&self, column: &str) -> bool {
        self.conds.iter().any(|c| match c {
            Cond::Eq(col, _) | Cond::Gte(col, _) | Cond::Lte(col, _) | Cond::ILike(col, _) => {
                *col == column
            }
        })
    }

    fn render(&self, sql: &mut String, args: &mut Vec<SqlValue>) {
        if self.conds.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        for (i, cond) in self.conds.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            match cond {
                Cond::Eq(col, v) => {
                    args.push(v.clone());
                    sql.push_str(&format!("{} = ${}", col, args.len()));
                }
                Cond::Gte(col, v) => {
                    args.push(v.clone());
                    sql.push_str(&format!("{} >= ${}", col, args.len()));
                }
                Cond::Lte(col, v) => {
                    args.push(v.clone());
                    sql.push_str(&format!("{} <= ${}", col, args.len()));
                }
                Cond::ILike(col, pattern) => {
                    args.push(SqlValue::Text(Some(pattern.clone())));
                    sql.push_str(&format!("{} ILIKE ${}", col, args.len()));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: &'static str,
    predicate: Predicate,
    order_by: Option<(&'static str, Order)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            predicate: Predicate::new(),
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.order_by = Some((column, order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn merge_eq(&mut self, column: &'static str, value: impl Into<SqlValue>) {
        self.predicate.conds.push(Cond::Eq(column, value.into()));
    }

    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let mut sql = format!("SELECT * FROM {}", self.table);
        let mut args = Vec::new();
        self.predicate.render(&mut sql, &mut args);
        if let Some((col, order)) = self.order_by {
            let dir = match order {
                Order::Asc => "ASC",
                Order::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY {} {}", col, dir));
        }
        if let Some(limit) = self.limit {
            args.push(SqlValue::Int(Some(limit)));
            sql.push_str(&format!(" LIMIT ${}", args.len()));
        }
        if let Some(offset) = self.offset {
            args.push(SqlValue::Int(Some(offset)));
            sql.push_str(&format!(" OFFSET ${}", args.len()));
        }
        (sql, args)
    }

    /// Same predicate, `COUNT(*)` projection, no ordering or paging.
    pub fn build_count(&self) -> (String, Vec<SqlValue>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let mut args = Vec::new();
        self.predicate.render(&mut sql, &mut args);
        (sql, args)
    }
}

#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: &'static str,
    columns: Vec<(&'static str, SqlValue)>,
}

impl InsertQuery {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
        }
    }

    pub fn value(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.columns.push((column, value.into()));
        self
    }

    /// Scoping hook: set `column`, displacing any caller-supplied value.
    /// The scope always wins over the payload for the owning-tenant column.
    pub(crate) fn merge_value(&mut self, column: &'static str, value: impl Into<SqlValue>) {
        self.columns.retain(|(col, _)| *col != column);
        self.columns.push((column, value.into()));
    }

    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let cols: Vec<&str> = self.columns.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("${}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            cols.join(", "),
            placeholders.join(", ")
        );
        let args = self.columns.iter().map(|(_, v)| v.clone()).collect();
        (sql, args)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: &'static str,
    sets: Vec<(&'static str, SqlValue)>,
    predicate: Predicate,
}

impl UpdateQuery {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
            predicate: Predicate::new(),
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.sets.push((column, value.into()));
        self
    }

    pub fn set_opt<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn has_changes(&self) -> bool {
        !self.sets.is_empty()
    }

    pub(crate) fn merge_eq(&mut self, column: &'static str, value: impl Into<SqlValue>) {
        self.predicate.conds.push(Cond::Eq(column, value.into()));
    }

    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let mut args: Vec<SqlValue> = Vec::new();
        let mut assignments = Vec::new();
        for (col, v) in &self.sets {
            args.push(v.clone());
            assignments.push(format!("{} = ${}", col, args.len()));
        }
        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));
        self.predicate.render(&mut sql, &mut args);
        (sql, args)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: &'static str,
    predicate: Predicate,
}

impl DeleteQuery {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            predicate: Predicate::new(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub(crate) fn merge_eq(&mut self, column: &'static str, value: impl Into<SqlValue>) {
        self.predicate.conds.push(Cond::Eq(column, value.into()));
    }

    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let mut sql = format!("DELETE FROM {}", self.table);
        let mut args = Vec::new();
        self.predicate.render(&mut sql, &mut args);
        (sql, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_renders_conjunction_in_order() {
        let id = Uuid::new_v4();
        let q = SelectQuery::from("contacts")
            .filter(Predicate::new().eq("contact_id", id).ilike("last_name", "smi%"))
            .order_by("created_utc", Order::Desc)
            .limit(10)
            .offset(20);
        let (sql, args) = q.build();
        assert_eq!(
            sql,
            "SELECT * FROM contacts WHERE contact_id = $1 AND last_name ILIKE $2 \
             ORDER BY created_utc DESC LIMIT $3 OFFSET $4"
        );
        assert_eq!(args.len(), 4);
        assert_eq!(args[0], SqlValue::Uuid(Some(id)));
    }

    #[test]
    fn count_drops_paging_but_keeps_predicate() {
        let q = SelectQuery::from("leads")
            .filter(Predicate::new().eq("stage_code", "new"))
            .limit(5);
        let (sql, args) = q.build_count();
        assert_eq!(sql, "SELECT COUNT(*) FROM leads WHERE stage_code = $1");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn insert_places_each_column_once() {
        let id = Uuid::new_v4();
        let mut q = InsertQuery::new("companies")
            .value("company_id", id)
            .value("name", "Acme");
        q.merge_value("tenant_id", Uuid::new_v4());
        let (sql, args) = q.build();
        assert_eq!(
            sql,
            "INSERT INTO companies (company_id, name, tenant_id) VALUES ($1, $2, $3)"
        );
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn merge_value_displaces_caller_supplied_column() {
        let scope_tenant = Uuid::new_v4();
        let mut q = InsertQuery::new("companies")
            .value("tenant_id", Uuid::new_v4())
            .value("name", "Acme");
        q.merge_value("tenant_id", scope_tenant);
        let (sql, args) = q.build();
        assert_eq!(sql, "INSERT INTO companies (name, tenant_id) VALUES ($1, $2)");
        assert_eq!(args[1], SqlValue::Uuid(Some(scope_tenant)));
    }

    #[test]
    fn update_numbers_placeholders_across_sets_and_predicate() {
        let id = Uuid::new_v4();
        let q = UpdateQuery::new("contacts")
            .set("first_name", "Ada")
            .set("phone", Option::<String>::None)
            .filter(Predicate::new().eq("contact_id", id));
        let (sql, args) = q.build();
        assert_eq!(
            sql,
            "UPDATE contacts SET first_name = $1, phone = $2 WHERE contact_id = $3"
        );
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], SqlValue::Text(None));
    }

    #[test]
    fn predicate_merge_keeps_existing_conditions() {
        let tenant = Uuid::new_v4();
        let mut q = SelectQuery::from("leads")
            .filter(Predicate::new().eq("stage_code", "qualified").gte("value_cents", 1000i64));
        q.merge_eq("tenant_id", tenant);
        let (sql, args) = q.build();
        assert_eq!(
            sql,
            "SELECT * FROM leads WHERE stage_code = $1 AND value_cents >= $2 AND tenant_id = $3"
        );
        assert_eq!(args[2], SqlValue::Uuid(Some(tenant)));
    }

    #[test]
    fn constrains_reports_scoped_column() {
        let p = Predicate::new().eq("tenant_id", Uuid::new_v4());
        assert!(p.constrains("tenant_id"));
        assert!(!p.constrains("company_id"));
    }
}
