//! Authentication middleware: credential verification + identity load.
//!
//! Every failure on this path - missing header, malformed or expired
//! token, unknown subject, failed lookup, inactive account - collapses
//! into the same `Unauthenticated` response. Callers cannot distinguish a
//! forged token from a deactivated account; the causes are logged
//! server-side only.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::AppState;
use crate::models::Role;

/// Identity resolved for the current request. Tenant and role come from
/// the verified token claims; the stored account row only contributes the
/// freshness check (`active`). A server-side role change therefore takes
/// effect when issued tokens expire or rotate, not immediately.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub email: String,
}

/// Middleware to require authentication.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthenticated(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state.jwt.validate_access_token(token)?;

    // Fresh per-request identity load. Lookup failures are authentication
    // failures here, not NotFound: "token valid but account gone" and
    // "token invalid" are indistinguishable at this boundary.
    let user = state
        .db
        .find_user_by_id(claims.sub)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Identity lookup failed during authentication");
            AppError::Unauthenticated(anyhow::anyhow!("Identity lookup failed"))
        })?
        .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Account not found")))?;

    if !user.active {
        return Err(AppError::Unauthenticated(anyhow::anyhow!("Account inactive")));
    }

    let current = CurrentUser {
        user_id: claims.sub,
        tenant_id: claims.tenant_id,
        role: claims.role,
        email: claims.email.clone(),
    };

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(current);

    Ok(next.run(req).await)
}

/// Extractor for the resolved identity in handlers.
#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Identity missing from request extensions"))
        })
    }
}
