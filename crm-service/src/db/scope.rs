//! Tenant scope resolution and scoped statement dispatch.
//!
//! A [`TenantDb`] is the only way business code reaches tenant data. It
//! wraps the shared pool with one tenant's scoping rule:
//!
//! - `field` mode merges `tenant_id = <T>` into every predicate and stamps
//!   the owning tenant onto every insert;
//! - `schema` mode runs every unit of work inside one transaction that
//!   first switches `search_path` to the tenant's private schema. Binding
//!   both statements to a single transaction pins them to a single pooled
//!   connection, and `SET LOCAL` reverts at transaction end, so no other
//!   request can ever observe the switched schema;
//! - `none` mode passes operations through unscoped and exists for
//!   tenant-agnostic maintenance work only.

use service_core::error::AppError;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::query::{
    DeleteQuery, InsertQuery, SelectQuery, SqlValue, UpdateQuery, bind_value, bind_value_as,
};

/// Process-wide tenant isolation strategy, read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationMode {
    None,
    Schema,
    Field,
}

impl IsolationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationMode::None => "none",
            IsolationMode::Schema => "schema",
            IsolationMode::Field => "field",
        }
    }
}

impl std::str::FromStr for IsolationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(IsolationMode::None),
            "schema" => Ok(IsolationMode::Schema),
            "field" => Ok(IsolationMode::Field),
            _ => Err(format!("Invalid isolation mode: {}", s)),
        }
    }
}

/// Postgres schema name derived from a tenant id.
///
/// Constructible only from a `Uuid`, so interpolating it into
/// `search_path` or DDL statements cannot carry arbitrary SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaName(String);

impl SchemaName {
    pub fn for_tenant(tenant_id: Uuid) -> Self {
        Self(format!("tenant_{}", tenant_id.simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The scoping rule a [`TenantDb`] applies to every operation.
#[derive(Debug, Clone)]
pub enum TenantScope {
    Unscoped,
    Schema { tenant_id: Uuid, schema: SchemaName },
    Field { tenant_id: Uuid },
}

/// A tenant-scoped data-access handle.
///
/// Cheap to create per operation; the underlying pool is shared and not
/// owned by the handle.
#[derive(Debug, Clone)]
pub struct TenantDb {
    pool: PgPool,
    scope: TenantScope,
}

impl TenantDb {
    /// Resolve a scoped handle for `tenant_id` under the configured mode.
    ///
    /// A missing tenant id in `schema` or `field` mode is a configuration
    /// fault and is raised here, before any statement is dispatched.
    pub fn resolve(
        pool: PgPool,
        mode: IsolationMode,
        tenant_id: Option<Uuid>,
    ) -> Result<Self, AppError> {
        let scope = match mode {
            IsolationMode::None => TenantScope::Unscoped,
            IsolationMode::Schema => {
                let tenant_id = require_tenant_id(mode, tenant_id)?;
                TenantScope::Schema {
                    tenant_id,
                    schema: SchemaName::for_tenant(tenant_id),
                }
            }
            IsolationMode::Field => TenantScope::Field {
                tenant_id: require_tenant_id(mode, tenant_id)?,
            },
        };
        Ok(Self { pool, scope })
    }

    pub fn scope(&self) -> &TenantScope {
        &self.scope
    }

    /// Open a scoped unit of work.
    ///
    /// In `schema` mode the `search_path` switch and every statement that
    /// follows share this one transaction, hence one pooled connection.
    pub async fn begin(&self) -> Result<ScopedTx, AppError> {
        let mut tx = self.pool.begin().await?;
        if let TenantScope::Schema { schema, .. } = &self.scope {
            let stmt = format!(r#"SET LOCAL search_path TO "{}", public"#, schema.as_str());
            sqlx::query(&stmt).execute(&mut *tx).await?;
        }
        Ok(ScopedTx {
            tx,
            scope: self.scope.clone(),
        })
    }

    pub async fn fetch_all<T>(&self, query: SelectQuery) -> Result<Vec<T>, AppError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut tx = self.begin().await?;
        let rows = tx.fetch_all(query).await?;
        tx.commit().await?;
        Ok(rows)
    }

    pub async fn fetch_optional<T>(&self, query: SelectQuery) -> Result<Option<T>, AppError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut tx = self.begin().await?;
        let row = tx.fetch_optional(query).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn count(&self, query: SelectQuery) -> Result<i64, AppError> {
        let mut tx = self.begin().await?;
        let count = tx.count(query).await?;
        tx.commit().await?;
        Ok(count)
    }

    pub async fn insert(&self, query: InsertQuery) -> Result<u64, AppError> {
        let mut tx = self.begin().await?;
        let affected = tx.insert(query).await?;
        tx.commit().await?;
        Ok(affected)
    }

    pub async fn update(&self, query: UpdateQuery) -> Result<u64, AppError> {
        let mut tx = self.begin().await?;
        let affected = tx.update(query).await?;
        tx.commit().await?;
        Ok(affected)
    }

    pub async fn delete(&self, query: DeleteQuery) -> Result<u64, AppError> {
        let mut tx = self.begin().await?;
        let affected = tx.delete(query).await?;
        tx.commit().await?;
        Ok(affected)
    }
}

fn require_tenant_id(mode: IsolationMode, tenant_id: Option<Uuid>) -> Result<Uuid, AppError> {
    tenant_id.ok_or_else(|| {
        AppError::ConfigError(anyhow::anyhow!(
            "Tenant id is required for isolation mode '{}'",
            mode.as_str()
        ))
    })
}

/// An in-flight scoped unit of work. Every dispatch applies the scoping
/// rule; result shapes are identical to unscoped execution.
pub struct ScopedTx {
    tx: Transaction<'static, Postgres>,
    scope: TenantScope,
}

impl ScopedTx {
    pub async fn fetch_all<T>(&mut self, query: SelectQuery) -> Result<Vec<T>, AppError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let (sql, args) = scope_select(query, &self.scope).build();
        let mut q = sqlx::query_as::<Postgres, T>(&sql);
        for arg in args {
            q = bind_value_as(q, arg);
        }
        Ok(q.fetch_all(&mut *self.tx).await?)
    }

    pub async fn fetch_optional<T>(&mut self, query: SelectQuery) -> Result<Option<T>, AppError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let (sql, args) = scope_select(query, &self.scope).build();
        let mut q = sqlx::query_as::<Postgres, T>(&sql);
        for arg in args {
            q = bind_value_as(q, arg);
        }
        Ok(q.fetch_optional(&mut *self.tx).await?)
    }

    pub async fn count(&mut self, query: SelectQuery) -> Result<i64, AppError> {
        let (sql, args) = scope_select(query, &self.scope).build_count();
        let mut q = sqlx::query_as::<Postgres, (i64,)>(&sql);
        for arg in args {
            q = bind_value_as(q, arg);
        }
        let (count,) = q.fetch_one(&mut *self.tx).await?;
        Ok(count)
    }

    pub async fn insert(&mut self, query: InsertQuery) -> Result<u64, AppError> {
        let (sql, args) = scope_insert(query, &self.scope).build();
        self.execute(&sql, args).await
    }

    pub async fn update(&mut self, query: UpdateQuery) -> Result<u64, AppError> {
        let mut query = query;
        if let TenantScope::Field { tenant_id } = &self.scope {
            query.merge_eq("tenant_id", *tenant_id);
        }
        let (sql, args) = query.build();
        self.execute(&sql, args).await
    }

    pub async fn delete(&mut self, query: DeleteQuery) -> Result<u64, AppError> {
        let mut query = query;
        if let TenantScope::Field { tenant_id } = &self.scope {
            query.merge_eq("tenant_id", *tenant_id);
        }
        let (sql, args) = query.build();
        self.execute(&sql, args).await
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str, args: Vec<SqlValue>) -> Result<u64, AppError> {
        let mut q = sqlx::query(sql);
        for arg in args {
            q = bind_value(q, arg);
        }
        Ok(q.execute(&mut *self.tx).await?.rows_affected())
    }
}

fn scope_select(mut query: SelectQuery, scope: &TenantScope) -> SelectQuery {
    if let TenantScope::Field { tenant_id } = scope {
        query.merge_eq("tenant_id", *tenant_id);
    }
    query
}

fn scope_insert(mut query: InsertQuery, scope: &TenantScope) -> InsertQuery {
    // Rows record their owning tenant in both isolated modes; read
    // isolation in schema mode still comes solely from search_path.
    match scope {
        TenantScope::Field { tenant_id } | TenantScope::Schema { tenant_id, .. } => {
            query.merge_value("tenant_id", *tenant_id);
        }
        TenantScope::Unscoped => {}
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::Predicate;

    #[test]
    fn isolation_mode_parses_known_values() {
        assert_eq!("schema".parse::<IsolationMode>().unwrap(), IsolationMode::Schema);
        assert_eq!("FIELD".parse::<IsolationMode>().unwrap(), IsolationMode::Field);
        assert_eq!("none".parse::<IsolationMode>().unwrap(), IsolationMode::None);
        assert!("row".parse::<IsolationMode>().is_err());
    }

    #[test]
    fn schema_name_uses_simple_uuid_form() {
        let id = Uuid::parse_str("6d9f0e2a-48c5-4b11-9b2e-1f4f4c2a7d10").unwrap();
        let schema = SchemaName::for_tenant(id);
        assert_eq!(schema.as_str(), "tenant_6d9f0e2a48c54b119b2e1f4f4c2a7d10");
        assert!(schema.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn field_scope_injects_tenant_predicate() {
        let tenant = Uuid::new_v4();
        let scope = TenantScope::Field { tenant_id: tenant };
        let query = SelectQuery::from("contacts")
            .filter(Predicate::new().eq("last_name", "Doe"));
        let (sql, args) = scope_select(query, &scope).build();
        assert_eq!(
            sql,
            "SELECT * FROM contacts WHERE last_name = $1 AND tenant_id = $2"
        );
        assert_eq!(args[1], SqlValue::Uuid(Some(tenant)));
    }

    #[test]
    fn field_scope_stamps_inserts() {
        let tenant = Uuid::new_v4();
        let scope = TenantScope::Field { tenant_id: tenant };
        let query = InsertQuery::new("companies").value("name", "Acme");
        let (sql, args) = scope_insert(query, &scope).build();
        assert_eq!(sql, "INSERT INTO companies (name, tenant_id) VALUES ($1, $2)");
        assert_eq!(args[1], SqlValue::Uuid(Some(tenant)));
    }

    #[test]
    fn schema_scope_leaves_predicates_alone() {
        let tenant = Uuid::new_v4();
        let scope = TenantScope::Schema {
            tenant_id: tenant,
            schema: SchemaName::for_tenant(tenant),
        };
        let query = SelectQuery::from("contacts")
            .filter(Predicate::new().eq("last_name", "Doe"));
        let (sql, _) = scope_select(query, &scope).build();
        assert_eq!(sql, "SELECT * FROM contacts WHERE last_name = $1");
    }

    #[test]
    fn unscoped_passes_through_untouched() {
        let query = SelectQuery::from("contacts");
        let (sql, args) = scope_select(query, &TenantScope::Unscoped).build();
        assert_eq!(sql, "SELECT * FROM contacts");
        assert!(args.is_empty());
    }

    #[tokio::test]
    async fn resolve_requires_tenant_id_in_schema_mode() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let err = TenantDb::resolve(pool, IsolationMode::Schema, None).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[tokio::test]
    async fn resolve_requires_tenant_id_in_field_mode() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let err = TenantDb::resolve(pool, IsolationMode::Field, None).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[tokio::test]
    async fn resolve_none_mode_is_unscoped_without_tenant() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let db = TenantDb::resolve(pool, IsolationMode::None, None).unwrap();
        assert!(matches!(db.scope(), TenantScope::Unscoped));
    }
}
