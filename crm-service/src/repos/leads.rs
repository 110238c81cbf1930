use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use crate::db::{DeleteQuery, InsertQuery, Order, Predicate, SelectQuery, TenantDb, UpdateQuery};
use crate::dtos::PageQuery;
use crate::models::{Lead, LeadStage, UpdateLeadRequest};

const TABLE: &str = "leads";

pub async fn insert(db: &TenantDb, lead: &Lead) -> Result<(), AppError> {
    let query = InsertQuery::new(TABLE)
        .value("lead_id", lead.lead_id)
        .value("contact_id", lead.contact_id)
        .value("title", lead.title.clone())
        .value("stage_code", lead.stage_code.clone())
        .value("value_cents", lead.value_cents)
        .value("owner_user_id", lead.owner_user_id)
        .value("created_utc", lead.created_utc)
        .value("updated_utc", lead.updated_utc);
    db.insert(query).await?;
    Ok(())
}

pub async fn find_by_id(db: &TenantDb, lead_id: Uuid) -> Result<Option<Lead>, AppError> {
    let query = SelectQuery::from(TABLE).filter(Predicate::new().eq("lead_id", lead_id));
    db.fetch_optional(query).await
}

/// List leads, optionally restricted to one pipeline stage.
pub async fn list(
    db: &TenantDb,
    stage: Option<LeadStage>,
    page: PageQuery,
) -> Result<(Vec<Lead>, i64), AppError> {
    let query = SelectQuery::from(TABLE)
        .filter(Predicate::new().eq_opt("stage_code", stage.map(|s| s.as_str())))
        .order_by("created_utc", Order::Desc)
        .limit(page.limit())
        .offset(page.offset());

    let mut tx = db.begin().await?;
    let total = tx.count(query.clone()).await?;
    let items = tx.fetch_all(query).await?;
    tx.commit().await?;

    Ok((items, total))
}

pub async fn update(db: &TenantDb, lead_id: Uuid, req: &UpdateLeadRequest) -> Result<u64, AppError> {
    let query = UpdateQuery::new(TABLE)
        .set_opt("contact_id", req.contact_id)
        .set_opt("title", req.title.clone())
        .set_opt("stage_code", req.stage.map(|s| s.as_str()))
        .set_opt("value_cents", req.value_cents)
        .set_opt("owner_user_id", req.owner_user_id);

    if !query.has_changes() {
        return Err(AppError::BadRequest(anyhow::anyhow!("No fields to update")));
    }

    let query = query
        .set("updated_utc", Utc::now())
        .filter(Predicate::new().eq("lead_id", lead_id));

    db.update(query).await
}

pub async fn delete(db: &TenantDb, lead_id: Uuid) -> Result<u64, AppError> {
    let query = DeleteQuery::new(TABLE).filter(Predicate::new().eq("lead_id", lead_id));
    db.delete(query).await
}
