//! Company CRUD handlers. All data access goes through the tenant-scoped
//! handle; cross-tenant ids are indistinguishable from nonexistent ones.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use service_core::{error::AppError, response::ApiResponse};
use uuid::Uuid;

use crate::{
    AppState,
    dtos::{PageQuery, Paginated},
    middleware::{CurrentUser, TenantContext},
    models::{
        AuditAction, AuditRecord, Company, CreateCompanyRequest, UpdateCompanyRequest,
        company::CompanyResponse,
    },
    repos,
    utils::ValidatedJson,
};

pub async fn create_company(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    ValidatedJson(req): ValidatedJson<CreateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;
    let company = Company::new(tenant.tenant_id, req.name, req.domain, req.industry);
    repos::companies::insert(&db, &company).await?;

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::CompanyCreated,
        "company",
        company.company_id,
        None,
    ));

    Ok((
        StatusCode::CREATED,
        ApiResponse::success("Company created", CompanyResponse::from(company)),
    ))
}

pub async fn list_companies(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;
    let (items, total) = repos::companies::list(&db, page).await?;

    Ok(ApiResponse::success(
        "Companies retrieved",
        Paginated {
            items: items.into_iter().map(CompanyResponse::from).collect::<Vec<_>>(),
            total,
            limit: page.limit(),
            offset: page.offset(),
        },
    ))
}

pub async fn get_company(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;
    let company = repos::companies::find_by_id(&db, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    Ok(ApiResponse::success(
        "Company retrieved",
        CompanyResponse::from(company),
    ))
}

pub async fn update_company(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(company_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;

    let affected = repos::companies::update(&db, company_id, &req).await?;
    if affected == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Company not found")));
    }

    let company = repos::companies::find_by_id(&db, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::CompanyUpdated,
        "company",
        company_id,
        None,
    ));

    Ok(ApiResponse::success(
        "Company updated",
        CompanyResponse::from(company),
    ))
}

pub async fn delete_company(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;

    let affected = repos::companies::delete(&db, company_id).await?;
    if affected == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Company not found")));
    }

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::CompanyDeleted,
        "company",
        company_id,
        None,
    ));

    Ok(ApiResponse::success("Company deleted", serde_json::json!({})))
}
