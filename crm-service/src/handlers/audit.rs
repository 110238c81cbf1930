//! Audit query surface (admin).
//!
//! Read-only listing over the append-only audit log, always constrained
//! to the caller's tenant.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use service_core::{error::AppError, response::ApiResponse};
use uuid::Uuid;

use crate::{
    AppState,
    dtos::Paginated,
    middleware::TenantContext,
    models::AuditRecordResponse,
    services::AuditFilter,
};

#[derive(Debug, Deserialize)]
pub struct ListAuditRecordsQuery {
    pub actor_user_id: Option<Uuid>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub from_utc: Option<DateTime<Utc>>,
    pub to_utc: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

/// List audit records with filtering and pagination.
///
/// GET /audit/records
#[tracing::instrument(
    skip(state),
    fields(
        tenant_id = %tenant.tenant_id,
        action = ?query.action,
        resource_type = ?query.resource_type,
        limit = query.limit,
        offset = query.offset
    )
)]
pub async fn list_audit_records(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListAuditRecordsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.clamp(1, 1000);
    let offset = query.offset.max(0);

    let (records, total) = state
        .db
        .find_audit_records(
            tenant.tenant_id,
            AuditFilter {
                actor_user_id: query.actor_user_id,
                action: query.action,
                resource_type: query.resource_type,
                resource_id: query.resource_id,
                from_utc: query.from_utc,
                to_utc: query.to_utc,
                limit,
                offset,
            },
        )
        .await?;

    let items: Vec<AuditRecordResponse> =
        records.into_iter().map(AuditRecordResponse::from).collect();

    Ok(ApiResponse::success(
        "Audit records retrieved",
        Paginated {
            items,
            total,
            limit,
            offset,
        },
    ))
}
