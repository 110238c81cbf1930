//! Contact entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct Contact {
    pub contact_id: Uuid,
    pub tenant_id: Uuid,
    pub company_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Contact {
    pub fn new(
        tenant_id: Uuid,
        company_id: Option<Uuid>,
        first_name: String,
        last_name: String,
        email: Option<String>,
        phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            contact_id: Uuid::new_v4(),
            tenant_id,
            company_id,
            first_name,
            last_name,
            email,
            phone,
            created_utc: now,
            updated_utc: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    pub company_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120))]
    pub first_name: String,
    #[validate(length(min = 1, max = 120))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateContactRequest {
    pub company_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub contact_id: Uuid,
    pub company_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Contact> for ContactResponse {
    fn from(c: Contact) -> Self {
        Self {
            contact_id: c.contact_id,
            company_id: c.company_id,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            phone: c.phone,
            created_utc: c.created_utc,
            updated_utc: c.updated_utc,
        }
    }
}
