//! Company entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct Company {
    pub company_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Company {
    pub fn new(tenant_id: Uuid, name: String, domain: Option<String>, industry: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            company_id: Uuid::new_v4(),
            tenant_id,
            name,
            domain,
            industry,
            created_utc: now,
            updated_utc: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub domain: Option<String>,
    #[validate(length(max = 120))]
    pub industry: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub domain: Option<String>,
    #[validate(length(max = 120))]
    pub industry: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub company_id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Company> for CompanyResponse {
    fn from(c: Company) -> Self {
        Self {
            company_id: c.company_id,
            name: c.name,
            domain: c.domain,
            industry: c.industry,
            created_utc: c.created_utc,
            updated_utc: c.updated_utc,
        }
    }
}
