//! Lead entity and pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Lead pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStage {
    New,
    Contacted,
    Qualified,
    Won,
    Lost,
}

impl LeadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStage::New => "new",
            LeadStage::Contacted => "contacted",
            LeadStage::Qualified => "qualified",
            LeadStage::Won => "won",
            LeadStage::Lost => "lost",
        }
    }
}

impl std::str::FromStr for LeadStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStage::New),
            "contacted" => Ok(LeadStage::Contacted),
            "qualified" => Ok(LeadStage::Qualified),
            "won" => Ok(LeadStage::Won),
            "lost" => Ok(LeadStage::Lost),
            _ => Err(format!("Unknown lead stage: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Lead {
    pub lead_id: Uuid,
    pub tenant_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub title: String,
    pub stage_code: String,
    pub value_cents: Option<i64>,
    pub owner_user_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Lead {
    pub fn new(
        tenant_id: Uuid,
        contact_id: Option<Uuid>,
        title: String,
        stage: LeadStage,
        value_cents: Option<i64>,
        owner_user_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            lead_id: Uuid::new_v4(),
            tenant_id,
            contact_id,
            title,
            stage_code: stage.as_str().to_string(),
            value_cents,
            owner_user_id,
            created_utc: now,
            updated_utc: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLeadRequest {
    pub contact_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default = "default_stage")]
    pub stage: LeadStage,
    #[validate(range(min = 0))]
    pub value_cents: Option<i64>,
}

fn default_stage() -> LeadStage {
    LeadStage::New
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLeadRequest {
    pub contact_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub stage: Option<LeadStage>,
    #[validate(range(min = 0))]
    pub value_cents: Option<i64>,
    pub owner_user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub lead_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub title: String,
    pub stage: String,
    pub value_cents: Option<i64>,
    pub owner_user_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Lead> for LeadResponse {
    fn from(l: Lead) -> Self {
        Self {
            lead_id: l.lead_id,
            contact_id: l.contact_id,
            title: l.title,
            stage: l.stage_code,
            value_cents: l.value_cents,
            owner_user_id: l.owner_user_id,
            created_utc: l.created_utc,
            updated_utc: l.updated_utc,
        }
    }
}
