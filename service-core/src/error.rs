use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy shared by all services.
///
/// Authentication failures are deliberately indistinguishable to callers:
/// every `Unauthenticated` response carries the same body regardless of
/// whether the token was malformed, expired, or the account is gone.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound(anyhow::anyhow!("Resource not found")),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Resource already exists"))
            }
            _ => AppError::Database(anyhow::Error::new(err)),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Unauthenticated(anyhow::Error::new(err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(_, _) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ConfigError(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message surfaced to the caller. Server faults and authentication
    /// failures get fixed wording so internals never leak.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Validation error".to_string(),
            AppError::BadRequest(err) => err.to_string(),
            AppError::Unauthenticated(_) => "Invalid User".to_string(),
            AppError::Forbidden(_) => "Access denied".to_string(),
            AppError::NotFound(err) => err.to_string(),
            AppError::Conflict(err) => err.to_string(),
            AppError::TooManyRequests(msg, _) => msg.clone(),
            AppError::ConfigError(_) => "Configuration error".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Detail strings for the `errors` array. Validation details are always
    /// shown; everything else only in debug builds.
    fn details(&self) -> Vec<String> {
        match self {
            AppError::Validation(errs) => errs
                .field_errors()
                .into_iter()
                .map(|(field, errors)| {
                    let msgs: Vec<String> = errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    format!("{}: {}", field, msgs.join(", "))
                })
                .collect(),
            _ if cfg!(debug_assertions) => vec![self.to_string()],
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed with server error");
        }

        let retry_after = match &self {
            AppError::TooManyRequests(_, retry) => *retry,
            _ => None,
        };

        let body = json!({
            "status": "error",
            "message": self.public_message(),
            "data": {},
            "errors": self.details(),
        });

        let mut res = (status, Json(body)).into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_message_is_uniform() {
        let from_token = AppError::Unauthenticated(anyhow::anyhow!("signature mismatch"));
        let from_account = AppError::Unauthenticated(anyhow::anyhow!("account inactive"));
        assert_eq!(from_token.public_message(), "Invalid User");
        assert_eq!(from_account.public_message(), from_token.public_message());
    }

    #[test]
    fn forbidden_maps_to_403_with_fixed_message() {
        let err = AppError::Forbidden(anyhow::anyhow!("role agent lacks admin"));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.public_message(), "Access denied");
    }

    #[test]
    fn config_error_is_a_server_fault() {
        let err = AppError::ConfigError(anyhow::anyhow!("tenant id required"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
