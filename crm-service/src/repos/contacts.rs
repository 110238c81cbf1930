use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use crate::db::{DeleteQuery, InsertQuery, Order, Predicate, SelectQuery, TenantDb, UpdateQuery};
use crate::dtos::PageQuery;
use crate::models::{Contact, UpdateContactRequest};

const TABLE: &str = "contacts";

pub async fn insert(db: &TenantDb, contact: &Contact) -> Result<(), AppError> {
    let query = InsertQuery::new(TABLE)
        .value("contact_id", contact.contact_id)
        .value("company_id", contact.company_id)
        .value("first_name", contact.first_name.clone())
        .value("last_name", contact.last_name.clone())
        .value("email", contact.email.clone())
        .value("phone", contact.phone.clone())
        .value("created_utc", contact.created_utc)
        .value("updated_utc", contact.updated_utc);
    db.insert(query).await?;
    Ok(())
}

pub async fn find_by_id(db: &TenantDb, contact_id: Uuid) -> Result<Option<Contact>, AppError> {
    let query = SelectQuery::from(TABLE).filter(Predicate::new().eq("contact_id", contact_id));
    db.fetch_optional(query).await
}

/// List contacts, optionally restricted to one company and/or a
/// case-insensitive last-name prefix.
pub async fn list(
    db: &TenantDb,
    company_id: Option<Uuid>,
    last_name_prefix: Option<String>,
    page: PageQuery,
) -> Result<(Vec<Contact>, i64), AppError> {
    let mut predicate = Predicate::new().eq_opt("company_id", company_id);
    if let Some(prefix) = last_name_prefix {
        predicate = predicate.ilike("last_name", format!("{}%", prefix));
    }

    let query = SelectQuery::from(TABLE)
        .filter(predicate)
        .order_by("created_utc", Order::Desc)
        .limit(page.limit())
        .offset(page.offset());

    let mut tx = db.begin().await?;
    let total = tx.count(query.clone()).await?;
    let items = tx.fetch_all(query).await?;
    tx.commit().await?;

    Ok((items, total))
}

pub async fn update(
    db: &TenantDb,
    contact_id: Uuid,
    req: &UpdateContactRequest,
) -> Result<u64, AppError> {
    let query = UpdateQuery::new(TABLE)
        .set_opt("company_id", req.company_id)
        .set_opt("first_name", req.first_name.clone())
        .set_opt("last_name", req.last_name.clone())
        .set_opt("email", req.email.clone())
        .set_opt("phone", req.phone.clone());

    if !query.has_changes() {
        return Err(AppError::BadRequest(anyhow::anyhow!("No fields to update")));
    }

    let query = query
        .set("updated_utc", Utc::now())
        .filter(Predicate::new().eq("contact_id", contact_id));

    db.update(query).await
}

pub async fn delete(db: &TenantDb, contact_id: Uuid) -> Result<u64, AppError> {
    let query = DeleteQuery::new(TABLE).filter(Predicate::new().eq("contact_id", contact_id));
    db.delete(query).await
}
