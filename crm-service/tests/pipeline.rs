//! End-to-end request pipeline tests.
//!
//! Drive the real router: authentication, role gates, tenant-scoped reads,
//! and audit failure isolation. Require PostgreSQL via TEST_DATABASE_URL;
//! ignored by default.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use crm_service::config::{
    CrmConfig, DatabaseConfig, Environment, JwtConfig, RateLimitConfig, SecurityConfig,
    TenancyConfig,
};
use crm_service::db::IsolationMode;
use crm_service::models::{AuditRecord, Role, Tenant, User};
use crm_service::services::{AuditRecorder, AuditSink, AuthService, Database, JwtService};
use crm_service::utils::{Password, hash_password};
use crm_service::{AppState, build_router};
use service_core::async_trait::async_trait;
use service_core::error::AppError;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn append(&self, _record: &AuditRecord) -> Result<(), AppError> {
        Err(AppError::Database(anyhow::anyhow!("audit store is down")))
    }
}

async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/crm_test".to_string());
    let pool = PgPool::connect(&url).await.expect("connect to test database");
    sqlx::migrate!("./migrations").run(&pool).await.expect("run migrations");
    pool
}

fn test_config(url: String) -> CrmConfig {
    CrmConfig {
        common: service_core::config::Config {
            port: 8080,
            bind_address: "127.0.0.1".to_string(),
        },
        environment: Environment::Dev,
        service_name: "crm-service".to_string(),
        service_version: "test".to_string(),
        log_level: "warn".to_string(),
        database: DatabaseConfig {
            url,
            max_connections: 5,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "pipeline-test-secret-0123456789abcdef".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        },
        tenancy: TenancyConfig {
            isolation_mode: IsolationMode::Field,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}

/// Build a full application over a failing audit sink.
async fn test_app(pool: PgPool) -> (Router, AppState) {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/crm_test".to_string());
    let config = test_config(url);
    let db = Database::new(pool);
    let jwt = JwtService::new(&config.jwt);
    let audit = AuditRecorder::new(Arc::new(FailingAuditSink));
    let auth_service = AuthService::new(
        db.clone(),
        jwt.clone(),
        audit.clone(),
        config.jwt.refresh_token_expiry_days,
    );

    let state = AppState {
        config,
        db,
        jwt,
        audit,
        auth_service,
        login_rate_limiter: create_ip_rate_limiter(1000, 60),
        ip_rate_limiter: create_ip_rate_limiter(10_000, 60),
    };

    let app = build_router(state.clone()).await.expect("build router");
    (app, state)
}

async fn seed_user(db: &Database, tenant_id: Uuid, role: Role, password: &str) -> User {
    let hash = hash_password(&Password::new(password.to_string())).unwrap();
    let user = User::new(
        tenant_id,
        format!("{}@example.com", Uuid::new_v4().simple()),
        hash.into_string(),
        "Pipeline Tester".to_string(),
        role,
    );
    db.insert_user(&user).await.unwrap();
    user
}

async fn seed_tenant(db: &Database) -> Tenant {
    let tenant = Tenant::new(
        format!("t-{}", Uuid::new_v4().simple()),
        "Pipeline Test".to_string(),
    );
    db.insert_tenant(&tenant).await.unwrap();
    tenant
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn login_then_cross_tenant_read_is_not_found() {
    let pool = test_pool().await;
    let (app, state) = test_app(pool).await;

    let tenant1 = seed_tenant(&state.db).await;
    let tenant2 = seed_tenant(&state.db).await;
    let user = seed_user(&state.db, tenant1.tenant_id, Role::Agent, "password123").await;

    // Login against tenant 1.
    let response = app
        .clone()
        .oneshot(
            Request::post("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "email": user.email,
                        "password": "password123"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    // A company belonging to tenant 2.
    let foreign_company = crm_service::models::Company::new(
        tenant2.tenant_id,
        "Foreign Corp".to_string(),
        None,
        None,
    );
    let db2 = crm_service::db::TenantDb::resolve(
        state.db.pool().clone(),
        IsolationMode::Field,
        Some(tenant2.tenant_id),
    )
    .unwrap();
    crm_service::repos::companies::insert(&db2, &foreign_company)
        .await
        .unwrap();

    // Reading it through tenant 1's token is indistinguishable from a
    // nonexistent resource.
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/companies/{}", foreign_company.company_id))
                .header(header::AUTHORIZATION, bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn create_succeeds_even_when_audit_write_fails() {
    let pool = test_pool().await;
    let (app, state) = test_app(pool).await;

    let tenant = seed_tenant(&state.db).await;
    let user = seed_user(&state.db, tenant.tenant_id, Role::Agent, "password123").await;
    let token = state
        .jwt
        .generate_access_token(user.user_id, tenant.tenant_id, Role::Agent, &user.email)
        .unwrap();

    // The app's audit sink always fails; the mutation must still commit
    // and report success.
    let response = app
        .clone()
        .oneshot(
            Request::post("/companies")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, bearer(&token))
                .body(Body::from(
                    serde_json::json!({ "name": "Resilient Inc" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    let company_id: Uuid = body["data"]["company_id"].as_str().unwrap().parse().unwrap();

    // And the row is durably there.
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/companies/{}", company_id))
                .header(header::AUTHORIZATION, bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn inactive_account_with_valid_token_is_unauthenticated() {
    let pool = test_pool().await;
    let (app, state) = test_app(pool.clone()).await;

    let tenant = seed_tenant(&state.db).await;
    let user = seed_user(&state.db, tenant.tenant_id, Role::Agent, "password123").await;

    // Token issued while the account was active.
    let token = state
        .jwt
        .generate_access_token(user.user_id, tenant.tenant_id, Role::Agent, &user.email)
        .unwrap();

    sqlx::query("UPDATE users SET active = FALSE WHERE user_id = $1")
        .bind(user.user_id)
        .execute(&pool)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::get("/users/me")
                .header(header::AUTHORIZATION, bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Unauthenticated, never Forbidden, with the uniform body.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid User");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn role_gates_deny_peers_and_admit_the_superuser() {
    let pool = test_pool().await;
    let (app, state) = test_app(pool).await;

    let tenant = seed_tenant(&state.db).await;
    let agent = seed_user(&state.db, tenant.tenant_id, Role::Agent, "password123").await;
    let superuser = seed_user(&state.db, tenant.tenant_id, Role::SuperAdmin, "password123").await;

    let agent_token = state
        .jwt
        .generate_access_token(agent.user_id, tenant.tenant_id, Role::Agent, &agent.email)
        .unwrap();
    let super_token = state
        .jwt
        .generate_access_token(
            superuser.user_id,
            tenant.tenant_id,
            Role::SuperAdmin,
            &superuser.email,
        )
        .unwrap();

    // Admin-gated surface rejects an agent.
    let response = app
        .clone()
        .oneshot(
            Request::get("/audit/records")
                .header(header::AUTHORIZATION, bearer(&agent_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Access denied");

    // The superuser passes a gate that names a different role.
    let response = app
        .clone()
        .oneshot(
            Request::get("/audit/records")
                .header(header::AUTHORIZATION, bearer(&super_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn refresh_rotates_and_old_token_stops_working() {
    let pool = test_pool().await;
    let (app, state) = test_app(pool).await;

    let tenant = seed_tenant(&state.db).await;
    let user = seed_user(&state.db, tenant.tenant_id, Role::Agent, "password123").await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "email": user.email,
                        "password": "password123"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let refresh_token = body["data"]["refresh_token"].as_str().unwrap().to_string();

    // First rotation succeeds.
    let response = app
        .clone()
        .oneshot(
            Request::post("/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "refresh_token": refresh_token }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The rotated-out token is single-use: replaying it fails.
    let response = app
        .clone()
        .oneshot(
            Request::post("/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "refresh_token": refresh_token }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
