//! User profile and administration handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use service_core::{error::AppError, response::ApiResponse};

use crate::{
    AppState,
    middleware::{CurrentUser, TenantContext},
    models::{AuditAction, AuditRecord, CreateUserRequest, SanitizedUser, User},
    utils::{Password, ValidatedJson, hash_password},
};

/// Get the authenticated user's profile.
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .db
        .find_user_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Account not found")))?;

    Ok(ApiResponse::success(
        "Profile retrieved",
        SanitizedUser::from(record),
    ))
}

/// Create a user in the caller's tenant (admin).
pub async fn create_user(
    State(state): State<AppState>,
    admin: CurrentUser,
    tenant: TenantContext,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if state.db.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Email already registered"
        )));
    }

    let password_hash = hash_password(&Password::new(req.password))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

    let user = User::new(
        tenant.tenant_id,
        req.email,
        password_hash.into_string(),
        req.display_name,
        req.role,
    );

    state.db.insert_user(&user).await?;

    tracing::info!(user_id = %user.user_id, "User created");

    state.audit.record(AuditRecord::new(
        tenant.tenant_id,
        Some(admin.user_id),
        AuditAction::UserCreated,
        "user",
        user.user_id,
        Some(serde_json::json!({ "role": user.role_code })),
    ));

    Ok((
        StatusCode::CREATED,
        ApiResponse::success("User created", SanitizedUser::from(user)),
    ))
}
