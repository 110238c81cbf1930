//! Role model - flat hierarchy with a single universal top element.

use serde::{Deserialize, Serialize};

/// Closed role set. `SuperAdmin` grants every other role; all remaining
/// roles are peers. Extending the hierarchy later means extending the
/// grants relation, not the call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Manager,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Agent => "agent",
        }
    }

    /// Whether a caller holding `self` satisfies a `required` role check.
    pub fn grants(self, required: Role) -> bool {
        self == Role::SuperAdmin || self == required
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "agent" => Ok(Role::Agent),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_grants_every_role() {
        for required in [Role::SuperAdmin, Role::Admin, Role::Manager, Role::Agent] {
            assert!(Role::SuperAdmin.grants(required));
        }
    }

    #[test]
    fn peer_roles_do_not_grant_each_other() {
        assert!(!Role::Admin.grants(Role::Manager));
        assert!(!Role::Manager.grants(Role::Admin));
        assert!(!Role::Agent.grants(Role::Admin));
        assert!(Role::Manager.grants(Role::Manager));
    }

    #[test]
    fn role_codes_round_trip() {
        for role in [Role::SuperAdmin, Role::Admin, Role::Manager, Role::Agent] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }
}
