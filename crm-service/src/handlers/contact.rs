//! Contact CRUD handlers.

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
        AuditAction, AuditRecord, Contact, CreateContactRequest, UpdateContactRequest,
        contact::ContactResponse,
    },
    repos,
    utils::ValidatedJson,
};

#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    pub company_id: Option<Uuid>,
    /// Case-insensitive last-name prefix filter.
    pub q: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn create_contact(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    ValidatedJson(req): ValidatedJson<CreateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;

    // A referenced company must be visible within the caller's scope.
    if let Some(company_id) = req.company_id {
        repos::companies::find_by_id(&db, company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;
    }

    let contact = Contact::new(
        tenant.tenant_id,
        req.company_id,
        req.first_name,
        req.last_name,
        req.email,
        req.phone,
    );
    repos::contacts::insert(&db, &contact).await?;

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::ContactCreated,
        "contact",
        contact.contact_id,
        None,
    ));

    Ok((
        StatusCode::CREATED,
        ApiResponse::success("Contact created", ContactResponse::from(contact)),
    ))
}

pub async fn list_contacts(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListContactsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;
    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let (items, total) = repos::contacts::list(&db, query.company_id, query.q, page).await?;

    Ok(ApiResponse::success(
        "Contacts retrieved",
        Paginated {
            items: items.into_iter().map(ContactResponse::from).collect::<Vec<_>>(),
            total,
            limit: page.limit(),
            offset: page.offset(),
        },
    ))
}

pub async fn get_contact(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(contact_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;
    let contact = repos::contacts::find_by_id(&db, contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    Ok(ApiResponse::success(
        "Contact retrieved",
        ContactResponse::from(contact),
    ))
}

pub async fn update_contact(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(contact_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;

    let affected = repos::contacts::update(&db, contact_id, &req).await?;
    if affected == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Contact not found")));
    }

    let contact = repos::contacts::find_by_id(&db, contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::ContactUpdated,
        "contact",
        contact_id,
        None,
    ));

    Ok(ApiResponse::success(
        "Contact updated",
        ContactResponse::from(contact),
    ))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(contact_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.scoped_db(&tenant)?;

    let affected = repos::contacts::delete(&db, contact_id).await?;
    if affected == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Contact not found")));
    }

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(user.user_id),
        AuditAction::ContactDeleted,
        "contact",
        contact_id,
        None,
    ));

    Ok(ApiResponse::success("Contact deleted", serde_json::json!({})))
}
