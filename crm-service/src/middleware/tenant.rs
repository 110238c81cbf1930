//! Tenant context middleware.
//!
//! Runs after authentication: derives the request's tenant binding from
//! the resolved identity and attaches it for downstream handlers. The
//! isolation mode itself is process-wide configuration; only the tenant
//! id varies per request.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::auth::CurrentUser;

/// Tenant binding for the current request.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub tenant_id: Uuid,
}

/// Middleware to attach tenant context from the authenticated identity.
pub async fn tenant_context_middleware(mut request: Request, next: Next) -> Response {
    let tenant_context = request
        .extensions()
        .get::<CurrentUser>()
        .map(|user| TenantContext {
            tenant_id: user.tenant_id,
        });

    if let Some(ctx) = tenant_context {
        request.extensions_mut().insert(ctx);
    }

    next.run(request).await
}

/// Extractor for TenantContext in handlers.
#[axum::async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Tenant context not found")))
    }
}
