//! Tenant entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub tenant_slug: String,
    pub tenant_label: String,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

impl Tenant {
    pub fn new(tenant_slug: String, tenant_label: String) -> Self {
        Self {
            tenant_id: Uuid::new_v4(),
            tenant_slug,
            tenant_label,
            active: true,
            created_utc: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 2, max = 64))]
    pub tenant_slug: String,
    #[validate(length(min = 1, max = 200))]
    pub tenant_label: String,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub tenant_id: Uuid,
    pub tenant_slug: String,
    pub tenant_label: String,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<Tenant> for TenantResponse {
    fn from(t: Tenant) -> Self {
        Self {
            tenant_id: t.tenant_id,
            tenant_slug: t.tenant_slug,
            tenant_label: t.tenant_label,
            active: t.active,
            created_utc: t.created_utc,
        }
    }
}
