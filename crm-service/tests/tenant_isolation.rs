//! Tenant isolation integration tests.
//!
//! These require a running PostgreSQL reachable via TEST_DATABASE_URL and
//! are ignored by default, matching how the pool tests are handled.
//!
//! Run with:
//!   TEST_DATABASE_URL=postgres://localhost/crm_test cargo test -- --ignored

use crm_service::db::{
    self, IsolationMode, Predicate, SelectQuery, TenantDb,
    provision::provision_tenant_schema,
};
use crm_service::dtos::PageQuery;
use crm_service::models::{Company, RefreshToken};
use crm_service::repos;
use crm_service::services::Database;
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/crm_test".to_string());
    let pool = PgPool::connect(&url).await.expect("connect to test database");
    sqlx::migrate!("./migrations").run(&pool).await.expect("run migrations");
    pool
}

fn scoped(pool: &PgPool, mode: IsolationMode, tenant_id: Uuid) -> TenantDb {
    TenantDb::resolve(pool.clone(), mode, Some(tenant_id)).expect("resolve scoped handle")
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn field_mode_hides_other_tenants_rows() {
    let pool = test_pool().await;
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    let db_a = scoped(&pool, IsolationMode::Field, tenant_a);
    let db_b = scoped(&pool, IsolationMode::Field, tenant_b);

    let company = Company::new(tenant_a, "Isolated Inc".to_string(), None, None);
    repos::companies::insert(&db_a, &company).await.unwrap();

    // Owner sees it.
    let found = repos::companies::find_by_id(&db_a, company.company_id)
        .await
        .unwrap();
    assert!(found.is_some());

    // The other tenant gets the same answer as for a nonexistent id.
    let cross = repos::companies::find_by_id(&db_b, company.company_id)
        .await
        .unwrap();
    assert!(cross.is_none());

    // Cross-tenant mutations are no-ops, not errors.
    let deleted = repos::companies::delete(&db_b, company.company_id)
        .await
        .unwrap();
    assert_eq!(deleted, 0);

    let deleted = repos::companies::delete(&db_a, company.company_id)
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn field_mode_list_merges_caller_filter_with_tenant() {
    let pool = test_pool().await;
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    let db_a = scoped(&pool, IsolationMode::Field, tenant_a);
    let db_b = scoped(&pool, IsolationMode::Field, tenant_b);

    for name in ["One", "Two"] {
        let company = Company::new(tenant_a, name.to_string(), None, None);
        repos::companies::insert(&db_a, &company).await.unwrap();
    }
    let other = Company::new(tenant_b, "Other".to_string(), None, None);
    repos::companies::insert(&db_b, &other).await.unwrap();

    let (items, total) = repos::companies::list(&db_a, PageQuery::default())
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(items.iter().all(|c| c.tenant_id == tenant_a));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn schema_mode_concurrent_tenants_stay_isolated() {
    // Regression test for the pooled-connection hazard: the schema switch
    // and the operation must share one connection, so two tenants issuing
    // interleaved operations can never observe each other's schema.
    let pool = test_pool().await;
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    provision_tenant_schema(&pool, tenant_a).await.unwrap();
    provision_tenant_schema(&pool, tenant_b).await.unwrap();

    let db_a = scoped(&pool, IsolationMode::Schema, tenant_a);
    let db_b = scoped(&pool, IsolationMode::Schema, tenant_b);

    let run_tenant = |db: TenantDb, tenant_id: Uuid, marker: String| async move {
        for i in 0..20 {
            let company = Company::new(tenant_id, format!("{}-{}", marker, i), None, None);
            repos::companies::insert(&db, &company).await.unwrap();

            let (items, _) = repos::companies::list(&db, PageQuery::default())
                .await
                .unwrap();
            // Every visible row must carry this tenant's marker.
            assert!(
                items.iter().all(|c| c.name.starts_with(&marker)),
                "tenant {} observed foreign rows",
                tenant_id
            );
        }
    };

    let (a, b) = tokio::join!(
        tokio::spawn(run_tenant(db_a.clone(), tenant_a, "alpha".to_string())),
        tokio::spawn(run_tenant(db_b.clone(), tenant_b, "beta".to_string())),
    );
    a.unwrap();
    b.unwrap();

    // Back-to-back reads after the interleaving still see only own data.
    let (items_a, total_a) = repos::companies::list(&db_a, PageQuery::default())
        .await
        .unwrap();
    let (items_b, total_b) = repos::companies::list(&db_b, PageQuery::default())
        .await
        .unwrap();
    assert_eq!(total_a, 20);
    assert_eq!(total_b, 20);
    assert!(items_a.iter().all(|c| c.name.starts_with("alpha")));
    assert!(items_b.iter().all(|c| c.name.starts_with("beta")));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn schema_mode_does_not_leak_search_path_into_the_pool() {
    let pool = test_pool().await;
    let tenant = Uuid::new_v4();
    provision_tenant_schema(&pool, tenant).await.unwrap();

    let db = scoped(&pool, IsolationMode::Schema, tenant);
    let company = Company::new(tenant, "Leaky?".to_string(), None, None);
    repos::companies::insert(&db, &company).await.unwrap();

    // A plain pool connection after scoped work must still resolve
    // unqualified names against public, not the tenant schema.
    let (path,): (String,) = sqlx::query_as("SHOW search_path")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!path.contains("tenant_"), "search_path leaked: {}", path);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn unscoped_select_passes_through() {
    let pool = test_pool().await;
    let db = TenantDb::resolve(pool.clone(), IsolationMode::None, None).unwrap();

    // Maintenance-style query over a control-plane table.
    let count = db
        .count(SelectQuery::from("refresh_tokens").filter(Predicate::new()))
        .await
        .unwrap();
    assert!(count >= 0);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn refresh_token_rotation_is_atomic_and_single_use() {
    let pool = test_pool().await;
    let db = Database::new(pool.clone());

    // Minimal tenant + user to satisfy foreign keys.
    let tenant = crm_service::models::Tenant::new(
        format!("t-{}", Uuid::new_v4().simple()),
        "Rotation Test".to_string(),
    );
    db.insert_tenant(&tenant).await.unwrap();
    let user = crm_service::models::User::new(
        tenant.tenant_id,
        format!("{}@example.com", Uuid::new_v4().simple()),
        "hash".to_string(),
        "Rotation Tester".to_string(),
        crm_service::models::Role::Agent,
    );
    db.insert_user(&user).await.unwrap();

    let old_id = Uuid::new_v4();
    let old_row = RefreshToken::new_with_id(old_id, user.user_id, "old-token", 7);
    db.insert_refresh_token(&old_row).await.unwrap();

    let new_id = Uuid::new_v4();
    let new_row = RefreshToken::new_with_id(new_id, user.user_id, "new-token", 7);
    db.rotate_refresh_token(old_id, &new_row).await.unwrap();

    // Old token is gone, new one is live with a future expiry.
    assert!(db.find_valid_refresh_token(old_id).await.unwrap().is_none());
    let stored = db.find_valid_refresh_token(new_id).await.unwrap().unwrap();
    assert!(stored.expires_utc > chrono::Utc::now());
    assert!(stored.matches("new-token"));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn expired_refresh_token_row_is_rejected_by_lookup() {
    let pool = test_pool().await;
    let db = Database::new(pool.clone());

    let tenant = crm_service::models::Tenant::new(
        format!("t-{}", Uuid::new_v4().simple()),
        "Expiry Test".to_string(),
    );
    db.insert_tenant(&tenant).await.unwrap();
    let user = crm_service::models::User::new(
        tenant.tenant_id,
        format!("{}@example.com", Uuid::new_v4().simple()),
        "hash".to_string(),
        "Expiry Tester".to_string(),
        crm_service::models::Role::Agent,
    );
    db.insert_user(&user).await.unwrap();

    let token_id = Uuid::new_v4();
    let mut row = RefreshToken::new_with_id(token_id, user.user_id, "stale-token", 7);
    row.expires_utc = chrono::Utc::now() - chrono::Duration::minutes(1);
    db.insert_refresh_token(&row).await.unwrap();

    // Physically present, logically dead.
    assert!(db.find_valid_refresh_token(token_id).await.unwrap().is_none());

    let swept = db.delete_expired_refresh_tokens().await.unwrap();
    assert!(swept >= 1);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn provisioning_is_idempotent() {
    let pool = test_pool().await;
    let tenant = Uuid::new_v4();

    provision_tenant_schema(&pool, tenant).await.unwrap();
    provision_tenant_schema(&pool, tenant).await.unwrap();

    let db = scoped(&pool, IsolationMode::Schema, tenant);
    let (_, total) = repos::companies::list(&db, PageQuery::default())
        .await
        .unwrap();
    assert_eq!(total, 0);

    let _ = db::health_check(&pool).await;
}
