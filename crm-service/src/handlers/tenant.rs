//! Tenant administration handlers (superuser only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use service_core::{error::AppError, response::ApiResponse};
use uuid::Uuid;

use crate::{
    AppState,
    db::{IsolationMode, provision::provision_tenant_schema},
    middleware::CurrentUser,
    models::{AuditAction, AuditRecord, CreateTenantRequest, Tenant, TenantResponse},
    utils::ValidatedJson,
};

/// Create a tenant. In schema isolation mode this also provisions the
/// tenant's private schema before the tenant becomes visible.
pub async fn create_tenant(
    State(state): State<AppState>,
    admin: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateTenantRequest>,
) -> Result<impl IntoResponse, AppError> {
    if state
        .db
        .find_tenant_by_slug(&req.tenant_slug)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Tenant slug already exists"
        )));
    }

    let tenant = Tenant::new(req.tenant_slug, req.tenant_label);
    state.db.insert_tenant(&tenant).await?;

    if state.config.tenancy.isolation_mode == IsolationMode::Schema {
        provision_tenant_schema(state.db.pool(), tenant.tenant_id).await?;
    }

    tracing::info!(tenant_id = %tenant.tenant_id, slug = %tenant.tenant_slug, "Tenant created");

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(admin.user_id),
        AuditAction::TenantCreated,
        "tenant",
        tenant.tenant_id,
        Some(serde_json::json!({ "slug": tenant.tenant_slug })),
    ));

    Ok((
        StatusCode::CREATED,
        ApiResponse::success("Tenant created", TenantResponse::from(tenant)),
    ))
}

/// Fetch a tenant by id.
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = state
        .db
        .find_tenant_by_id(tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Tenant not found")))?;

    Ok(ApiResponse::success(
        "Tenant retrieved",
        TenantResponse::from(tenant),
    ))
}
