//! Lead CRUD handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use service_core::{error::AppError, response::ApiResponse};
use uuid::Uuid;

use crate::{
    AppState,
    dtos::{PageQuery, Paginated},
    middleware::{CurrentUser, TenantContext},
    models::{
        AuditAction, AuditRecord, CreateLeadRequest, Lead, LeadStage, UpdateLeadRequest,
        lead::LeadResponse,
    },
    repos,
    utils::ValidatedJson,
};

#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    pub stage: Option<LeadStage>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn create_lead(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    ValidatedJson(req): ValidatedJson<CreateLeadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;

    if let Some(contact_id) = req.contact_id {
        repos::contacts::find_by_id(&db, contact_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;
    }

    let lead = Lead::new(
        tenant.tenant_id,
        req.contact_id,
        req.title,
        req.stage,
        req.value_cents,
        Some(user.user_id),
    );
    repos::leads::insert(&db, &lead).await?;

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::LeadCreated,
        "lead",
        lead.lead_id,
        None,
    ));

    Ok((
        StatusCode::CREATED,
        ApiResponse::success("Lead created", LeadResponse::from(lead)),
    ))
}

pub async fn list_leads(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListLeadsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;
    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let (items, total) = repos::leads::list(&db, query.stage, page).await?;

    Ok(ApiResponse::success(
        "Leads retrieved",
        Paginated {
            items: items.into_iter().map(LeadResponse::from).collect::<Vec<_>>(),
            total,
            limit: page.limit(),
            offset: page.offset(),
        },
    ))
}

pub async fn get_lead(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;
    let lead = repos::leads::find_by_id(&db, lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Lead not found")))?;

    Ok(ApiResponse::success("Lead retrieved", LeadResponse::from(lead)))
}

pub async fn update_lead(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(lead_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateLeadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;

    let affected = repos::leads::update(&db, lead_id, &req).await?;
    if affected == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Lead not found")));
    }

    let lead = repos::leads::find_by_id(&db, lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Lead not found")))?;

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::LeadUpdated,
        "lead",
        lead_id,
        None,
    ));

    Ok(ApiResponse::success("Lead updated", LeadResponse::from(lead)))
}

pub async fn delete_lead(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;

    let affected = repos::leads::delete(&db, lead_id).await?;
    if affected == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Lead not found")));
    }

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::LeadDeleted,
        "lead",
        lead_id,
        None,
    ));

    Ok(ApiResponse::success("Lead deleted", serde_json::json!({})))
}
