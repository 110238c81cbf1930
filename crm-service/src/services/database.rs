//! Control-plane database access.
//!
//! Tenants, accounts, refresh tokens, and audit records live in the
//! `public` schema and are reached through this wrapper on the shared
//! pool. They exist before a tenant is resolved, so no tenant scoping
//! applies here; tenant-owned business data goes through
//! [`crate::db::TenantDb`] instead.

use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::db::query::{Order, Predicate, SelectQuery, bind_value_as};
use crate::models::{AuditRecord, RefreshToken, Tenant, User};

/// PostgreSQL control-plane wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

/// Filters for the audit query surface.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub actor_user_id: Option<Uuid>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub from_utc: Option<DateTime<Utc>>,
    pub to_utc: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            AppError::Database(anyhow::anyhow!("Database health check failed: {}", e))
        })?;
        Ok(())
    }

    // ==================== Tenant Operations ====================

    pub async fn find_tenant_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    pub async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE tenant_slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    pub async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (tenant_id, tenant_slug, tenant_label, active, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(tenant.tenant_id)
        .bind(&tenant.tenant_slug)
        .bind(&tenant.tenant_label)
        .bind(tenant.active)
        .bind(tenant.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (user_id, tenant_id, email, password_hash, display_name, role_code, active, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.user_id)
        .bind(user.tenant_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.role_code)
        .bind(user.active)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ==================== Refresh Token Operations ====================

    pub async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_id, user_id, token_hash, expires_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(token.token_id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_utc)
        .bind(token.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Find a live refresh token. Expired rows are rejected here even when
    /// cleanup has not physically removed them yet.
    pub async fn find_valid_refresh_token(
        &self,
        token_id: Uuid,
    ) -> Result<Option<RefreshToken>, AppError> {
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_id = $1 AND expires_utc > NOW()",
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    /// Delete a refresh token (logout). Returns rows removed.
    pub async fn delete_refresh_token(&self, token_id: Uuid, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_id = $1 AND user_id = $2")
            .bind(token_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Single-use rotation: remove the old row and insert its replacement
    /// in one transaction, so a crash can never leave the session dangling
    /// between the two steps.
    pub async fn rotate_refresh_token(
        &self,
        old_token_id: Uuid,
        new_token: &RefreshToken,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE token_id = $1")
            .bind(old_token_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_id, user_id, token_hash, expires_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(new_token.token_id)
        .bind(new_token.user_id)
        .bind(&new_token.token_hash)
        .bind(new_token.expires_utc)
        .bind(new_token.created_utc)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Expiry-driven cleanup, for tenant-agnostic maintenance.
    pub async fn delete_expired_refresh_tokens(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_utc <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ==================== Audit Operations ====================

    pub async fn insert_audit_record(&self, record: &AuditRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_records
                (record_id, tenant_id, actor_user_id, action, resource_type, resource_id, metadata, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.record_id)
        .bind(record.tenant_id)
        .bind(record.actor_user_id)
        .bind(&record.action)
        .bind(&record.resource_type)
        .bind(record.resource_id)
        .bind(&record.metadata)
        .bind(record.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Audit query surface: filtered, newest-first, paginated, always
    /// constrained to one tenant.
    pub async fn find_audit_records(
        &self,
        tenant_id: Uuid,
        filter: AuditFilter,
    ) -> Result<(Vec<AuditRecord>, i64), AppError> {
        let predicate = Predicate::new()
            .eq("tenant_id", tenant_id)
            .eq_opt("actor_user_id", filter.actor_user_id)
            .eq_opt("action", filter.action)
            .eq_opt("resource_type", filter.resource_type)
            .eq_opt("resource_id", filter.resource_id)
            .gte_opt("created_utc", filter.from_utc)
            .lte_opt("created_utc", filter.to_utc);

        let query = SelectQuery::from("audit_records")
            .filter(predicate)
            .order_by("created_utc", Order::Desc)
            .limit(filter.limit)
            .offset(filter.offset);

        let (count_sql, count_args) = query.build_count();
        let mut count_q = sqlx::query_as::<_, (i64,)>(&count_sql);
        for arg in count_args {
            count_q = bind_value_as(count_q, arg);
        }
        let (total,) = count_q.fetch_one(&self.pool).await?;

        let (sql, args) = query.build();
        let mut rows_q = sqlx::query_as::<_, AuditRecord>(&sql);
        for arg in args {
            rows_q = bind_value_as(rows_q, arg);
        }
        let records = rows_q.fetch_all(&self.pool).await?;

        Ok((records, total))
    }
}
