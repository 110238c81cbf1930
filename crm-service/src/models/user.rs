//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::role::Role;

/// User account entity. Role and tenant are stored here for
/// administration, but per-request authorization reads them from the
/// verified token claims; the stored row only supplies the `active` check.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role_code: String,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

impl User {
    pub fn new(
        tenant_id: Uuid,
        email: String,
        password_hash: String,
        display_name: String,
        role: Role,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            tenant_id,
            email,
            password_hash,
            display_name,
            role_code: role.as_str().to_string(),
            active: true,
            created_utc: Utc::now(),
        }
    }

    /// Stored role; unknown codes fall back to the least-privileged role.
    pub fn role(&self) -> Role {
        self.role_code.parse().unwrap_or(Role::Agent)
    }
}

/// User representation safe for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            tenant_id: u.tenant_id,
            email: u.email,
            display_name: u.display_name,
            role: u.role_code,
            active: u.active,
            created_utc: u.created_utc,
        }
    }
}

/// Request to create a user in the caller's tenant.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub display_name: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_users_start_active() {
        let user = User::new(
            Uuid::new_v4(),
            "a@example.com".to_string(),
            "hash".to_string(),
            "A".to_string(),
            Role::Agent,
        );
        assert!(user.active);
        assert_eq!(user.role(), Role::Agent);
    }

    #[test]
    fn unknown_role_code_degrades_to_agent() {
        let mut user = User::new(
            Uuid::new_v4(),
            "a@example.com".to_string(),
            "hash".to_string(),
            "A".to_string(),
            Role::Admin,
        );
        user.role_code = "owner".to_string();
        assert_eq!(user.role(), Role::Agent);
    }

    #[test]
    fn sanitized_user_has_no_password_hash() {
        let user = User::new(
            Uuid::new_v4(),
            "a@example.com".to_string(),
            "hash".to_string(),
            "A".to_string(),
            Role::Manager,
        );
        let value = serde_json::to_value(SanitizedUser::from(user)).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["role"], "manager");
    }
}
