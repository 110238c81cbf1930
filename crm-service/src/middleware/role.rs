//! Role gate middleware.
//!
//! Declarative per-route authorization: a route states the role it
//! requires, and the gate admits callers whose role grants it. The grants
//! relation lives on [`Role`]; this layer only applies it.

use axum::{extract::Request, middleware::Next, response::Response};
use service_core::error::AppError;

use super::auth::CurrentUser;
use crate::models::Role;

/// Pure check, separated from the middleware for direct testing.
pub fn check_role(current: Role, required: Role) -> Result<(), AppError> {
    if current.grants(required) {
        Ok(())
    } else {
        Err(AppError::Forbidden(anyhow::anyhow!(
            "Role '{}' does not grant '{}'",
            current,
            required
        )))
    }
}

/// Middleware enforcing a required role. Apply inside the authentication
/// layer:
///
/// ```ignore
/// Router::new()
///     .route("/audit/records", get(list_audit_records))
///     .layer(from_fn(|req, next| require_role(Role::Admin, req, next)))
/// ```
pub async fn require_role(
    required: Role,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req.extensions().get::<CurrentUser>().ok_or_else(|| {
        AppError::Unauthenticated(anyhow::anyhow!("Identity missing from request"))
    })?;

    check_role(user.role, required)?;

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_role_passes() {
        assert!(check_role(Role::Admin, Role::Admin).is_ok());
    }

    #[test]
    fn super_admin_passes_any_gate() {
        for required in [Role::SuperAdmin, Role::Admin, Role::Manager, Role::Agent] {
            assert!(check_role(Role::SuperAdmin, required).is_ok());
        }
    }

    #[test]
    fn insufficient_role_is_forbidden_not_unauthenticated() {
        let err = check_role(Role::Agent, Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
