use crm_service::{
    AppState, build_router,
    config::CrmConfig,
    services::{AuditRecorder, AuthService, Database, JwtService, PgAuditSink},
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = CrmConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        isolation_mode = %config.tenancy.isolation_mode.as_str(),
        "Starting CRM service"
    );

    // Shared pool + control-plane wrapper
    let pool = crm_service::db::create_pool(&config.database).await.map_err(|e| {
        service_core::error::AppError::Database(anyhow::anyhow!("Failed to connect: {}", e))
    })?;
    crm_service::db::run_migrations(&pool).await.map_err(|e| {
        service_core::error::AppError::Database(anyhow::anyhow!("Migration failed: {}", e))
    })?;
    let db = Database::new(pool);
    tracing::info!("Database initialized successfully");

    let jwt = JwtService::new(&config.jwt);
    tracing::info!("JWT service initialized");

    let audit = AuditRecorder::new(Arc::new(PgAuditSink::new(db.clone())));
    tracing::info!("Audit recorder initialized");

    let auth_service = AuthService::new(
        db.clone(),
        jwt.clone(),
        audit.clone(),
        config.jwt.refresh_token_expiry_days,
    );

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login and Global IP");

    let state = AppState {
        config: config.clone(),
        db,
        jwt,
        audit,
        auth_service,
        login_rate_limiter,
        ip_rate_limiter,
    };

    // Expiry-driven refresh-token cleanup, detached from request handling.
    let sweeper_db = state.db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match sweeper_db.delete_expired_refresh_tokens().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(removed = n, "Swept expired refresh tokens"),
                Err(e) => tracing::error!(error = %e, "Refresh token sweep failed"),
            }
        }
    });

    let app = build_router(state).await?;

    let addr: SocketAddr = format!("{}:{}", config.common.bind_address, config.common.port)
        .parse()
        .map_err(|e| {
            service_core::error::AppError::ConfigError(anyhow::anyhow!(
                "Invalid bind address: {}",
                e
            ))
        })?;

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
