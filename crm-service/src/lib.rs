pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repos;
pub mod services;
pub mod utils;

use axum::{
    Router,
    extract::Request,
    middleware::{Next, from_fn, from_fn_with_state},
    routing::{get, post},
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::CrmConfig;
use crate::db::TenantDb;
use crate::middleware::{TenantContext, auth_middleware, require_role, tenant_context_middleware};
use crate::models::Role;
use crate::services::{AuditRecorder, AuthService, Database, JwtService};

#[derive(Clone)]
pub struct AppState {
    pub config: CrmConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub audit: AuditRecorder,
    pub auth_service: AuthService,
    pub login_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub ip_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
}

impl AppState {
    /// Resolve a tenant-scoped data handle for the current request.
    ///
    /// The isolation mode is process-wide; only the tenant id varies.
    /// Handlers above this call stay mode-agnostic.
    pub fn scoped_db(&self, tenant: &TenantContext) -> Result<TenantDb, AppError> {
        TenantDb::resolve(
            self.db.pool().clone(),
            self.config.tenancy.isolation_mode,
            Some(tenant.tenant_id),
        )
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Login gets its own tighter limiter on top of the global one.
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    // Superuser-only tenant administration.
    let tenant_admin_routes = Router::new()
        .route("/admin/tenants", post(handlers::tenant::create_tenant))
        .route("/admin/tenants/:tenant_id", get(handlers::tenant::get_tenant))
        .layer(from_fn(|req: Request, next: Next| {
            require_role(Role::SuperAdmin, req, next)
        }));

    // Admin-gated user administration and audit query surface.
    let user_admin_routes = Router::new()
        .route("/admin/users", post(handlers::user::create_user))
        .layer(from_fn(|req: Request, next: Next| {
            require_role(Role::Admin, req, next)
        }));

    let audit_routes = Router::new()
        .route("/audit/records", get(handlers::audit::list_audit_records))
        .layer(from_fn(|req: Request, next: Next| {
            require_role(Role::Admin, req, next)
        }));

    // Everything below requires authentication; the pipeline order is
    // fixed: credential verification -> identity load -> tenant context ->
    // (per-route) role gate -> handler.
    let authed_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/users/me", get(handlers::user::get_me))
        .route(
            "/companies",
            get(handlers::company::list_companies).post(handlers::company::create_company),
        )
        .route(
            "/companies/:company_id",
            get(handlers::company::get_company)
                .patch(handlers::company::update_company)
                .delete(handlers::company::delete_company),
        )
        .route(
            "/contacts",
            get(handlers::contact::list_contacts).post(handlers::contact::create_contact),
        )
        .route(
            "/contacts/:contact_id",
            get(handlers::contact::get_contact)
                .patch(handlers::contact::update_contact)
                .delete(handlers::contact::delete_contact),
        )
        .route(
            "/leads",
            get(handlers::lead::list_leads).post(handlers::lead::create_lead),
        )
        .route(
            "/leads/:lead_id",
            get(handlers::lead::get_lead)
                .patch(handlers::lead::update_lead)
                .delete(handlers::lead::delete_lead),
        )
        .merge(tenant_admin_routes)
        .merge(user_admin_routes)
        .merge(audit_routes)
        .layer(from_fn(tenant_context_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .merge(login_route)
        .merge(authed_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Request span with propagated request id
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        );

    Ok(app)
}

/// Service health check.
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "PostgreSQL health check failed");
        e
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "isolation_mode": state.config.tenancy.isolation_mode.as_str(),
        "checks": {
            "postgres": "up"
        }
    })))
}
