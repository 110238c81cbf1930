use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use crate::db::{DeleteQuery, InsertQuery, Order, Predicate, SelectQuery, TenantDb, UpdateQuery};
use crate::dtos::PageQuery;
use crate::models::{Company, UpdateCompanyRequest};

const TABLE: &str = "companies";

pub async fn insert(db: &TenantDb, company: &Company) -> Result<(), AppError> {
    let query = InsertQuery::new(TABLE)
        .value("company_id", company.company_id)
        .value("name", company.name.clone())
        .value("domain", company.domain.clone())
        .value("industry", company.industry.clone())
        .value("created_utc", company.created_utc)
        .value("updated_utc", company.updated_utc);
    db.insert(query).await?;
    Ok(())
}

pub async fn find_by_id(db: &TenantDb, company_id: Uuid) -> Result<Option<Company>, AppError> {
    let query = SelectQuery::from(TABLE).filter(Predicate::new().eq("company_id", company_id));
    db.fetch_optional(query).await
}

pub async fn list(db: &TenantDb, page: PageQuery) -> Result<(Vec<Company>, i64), AppError> {
    let query = SelectQuery::from(TABLE)
        .order_by("created_utc", Order::Desc)
        .limit(page.limit())
        .offset(page.offset());

    let mut tx = db.begin().await?;
    let total = tx.count(query.clone()).await?;
    let items = tx.fetch_all(query).await?;
    tx.commit().await?;

    Ok((items, total))
}

/// Apply a partial update. Returns rows affected; zero means the company
/// does not exist within the caller's scope.
pub async fn update(
    db: &TenantDb,
    company_id: Uuid,
    req: &UpdateCompanyRequest,
) -> Result<u64, AppError> {
    let query = UpdateQuery::new(TABLE)
        .set_opt("name", req.name.clone())
        .set_opt("domain", req.domain.clone())
        .set_opt("industry", req.industry.clone());

    if !query.has_changes() {
        return Err(AppError::BadRequest(anyhow::anyhow!("No fields to update")));
    }

    let query = query
        .set("updated_utc", Utc::now())
        .filter(Predicate::new().eq("company_id", company_id));

    db.update(query).await
}

pub async fn delete(db: &TenantDb, company_id: Uuid) -> Result<u64, AppError> {
    let query = DeleteQuery::new(TABLE).filter(Predicate::new().eq("company_id", company_id));
    db.delete(query).await
}
