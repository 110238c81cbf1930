//! Per-tenant schema provisioning for `schema` isolation mode.
//!
//! Runs when a tenant is created. The DDL mirrors the field-mode tables in
//! `migrations/` so a deployment can change isolation mode without a schema
//! rewrite. Idempotent: re-running for an existing tenant is safe.

use service_core::error::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::scope::SchemaName;

/// Data-plane tables replicated into every tenant schema.
const TENANT_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS "{schema}".companies (
        company_id   UUID PRIMARY KEY,
        tenant_id    UUID NOT NULL,
        name         TEXT NOT NULL,
        domain       TEXT,
        industry     TEXT,
        created_utc  TIMESTAMPTZ NOT NULL,
        updated_utc  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "{schema}".contacts (
        contact_id   UUID PRIMARY KEY,
        tenant_id    UUID NOT NULL,
        company_id   UUID,
        first_name   TEXT NOT NULL,
        last_name    TEXT NOT NULL,
        email        TEXT,
        phone        TEXT,
        created_utc  TIMESTAMPTZ NOT NULL,
        updated_utc  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "{schema}".leads (
        lead_id        UUID PRIMARY KEY,
        tenant_id      UUID NOT NULL,
        contact_id     UUID,
        title          TEXT NOT NULL,
        stage_code     TEXT NOT NULL,
        value_cents    BIGINT,
        owner_user_id  UUID,
        created_utc    TIMESTAMPTZ NOT NULL,
        updated_utc    TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// Create the tenant's private schema and its tables.
pub async fn provision_tenant_schema(pool: &PgPool, tenant_id: Uuid) -> Result<(), AppError> {
    let schema = SchemaName::for_tenant(tenant_id);

    let mut tx = pool.begin().await?;

    let create_schema = format!(r#"CREATE SCHEMA IF NOT EXISTS "{}""#, schema.as_str());
    sqlx::query(&create_schema).execute(&mut *tx).await?;

    for ddl in TENANT_TABLES {
        let stmt = ddl.replace("{schema}", schema.as_str());
        sqlx::query(&stmt).execute(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::info!(tenant_id = %tenant_id, schema = %schema.as_str(), "Provisioned tenant schema");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_templates_reference_the_schema_placeholder() {
        for ddl in TENANT_TABLES {
            assert!(ddl.contains(r#""{schema}"."#));
        }
    }
}
