//! Audit record model - append-only action log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Audited action types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserLogin,
    UserLogout,
    TokenRefreshed,
    UserCreated,
    TenantCreated,
    CompanyCreated,
    CompanyUpdated,
    CompanyDeleted,
    ContactCreated,
    ContactUpdated,
    ContactDeleted,
    LeadCreated,
    LeadUpdated,
    LeadDeleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserLogin => "user_login",
            AuditAction::UserLogout => "user_logout",
            AuditAction::TokenRefreshed => "token_refreshed",
            AuditAction::UserCreated => "user_created",
            AuditAction::TenantCreated => "tenant_created",
            AuditAction::CompanyCreated => "company_created",
            AuditAction::CompanyUpdated => "company_updated",
            AuditAction::CompanyDeleted => "company_deleted",
            AuditAction::ContactCreated => "contact_created",
            AuditAction::ContactUpdated => "contact_updated",
            AuditAction::ContactDeleted => "contact_deleted",
            AuditAction::LeadCreated => "lead_created",
            AuditAction::LeadUpdated => "lead_updated",
            AuditAction::LeadDeleted => "lead_deleted",
        }
    }
}

/// Immutable audit record. Never updated or deleted.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRecord {
    pub record_id: Uuid,
    pub tenant_id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        tenant_id: Uuid,
        actor_user_id: Option<Uuid>,
        action: AuditAction,
        resource_type: &str,
        resource_id: Uuid,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            tenant_id,
            actor_user_id,
            action: action.as_str().to_string(),
            resource_type: resource_type.to_string(),
            resource_id,
            metadata,
            created_utc: Utc::now(),
        }
    }
}

/// Audit record response for the query surface.
#[derive(Debug, Serialize)]
pub struct AuditRecordResponse {
    pub record_id: Uuid,
    pub tenant_id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl From<AuditRecord> for AuditRecordResponse {
    fn from(r: AuditRecord) -> Self {
        Self {
            record_id: r.record_id,
            tenant_id: r.tenant_id,
            actor_user_id: r.actor_user_id,
            action: r.action,
            resource_type: r.resource_type,
            resource_id: r.resource_id,
            metadata: r.metadata,
            created_utc: r.created_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_captures_actor_and_target() {
        let tenant = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let target = Uuid::new_v4();
        let record = AuditRecord::new(
            tenant,
            Some(actor),
            AuditAction::ContactCreated,
            "contact",
            target,
            Some(serde_json::json!({"source": "api"})),
        );
        assert_eq!(record.tenant_id, tenant);
        assert_eq!(record.actor_user_id, Some(actor));
        assert_eq!(record.action, "contact_created");
        assert_eq!(record.resource_type, "contact");
        assert_eq!(record.resource_id, target);
    }
}
