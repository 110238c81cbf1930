//! Session handlers: login, refresh, logout.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use service_core::{error::AppError, response::ApiResponse};

use crate::{
    AppState,
    dtos::auth::{LoginRequest, LogoutRequest, RefreshRequest},
    middleware::CurrentUser,
    utils::ValidatedJson,
};

/// Login with email and password.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth_service.login(req).await?;
    Ok((StatusCode::OK, ApiResponse::success("Login successful", tokens)))
}

/// Rotate a refresh token for a new token pair.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth_service.refresh(req).await?;
    Ok((StatusCode::OK, ApiResponse::success("Token refreshed", tokens)))
}

/// Logout and revoke the refresh token.
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth_service
        .logout(req.refresh_token, user.tenant_id)
        .await?;
    Ok((
        StatusCode::OK,
        ApiResponse::success("Logged out successfully", serde_json::json!({})),
    ))
}
