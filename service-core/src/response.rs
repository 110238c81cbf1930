use axum::Json;
use serde::Serialize;

/// Standard success envelope: `{status, message, data, errors}`.
///
/// Error responses use the same shape; they are produced by
/// [`crate::error::AppError`]'s `IntoResponse` impl so the two can never
/// drift apart structurally.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
    pub errors: Vec<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
            data,
            errors: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let Json(body) = ApiResponse::success("Created", serde_json::json!({"id": 1}));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Created");
        assert_eq!(value["data"]["id"], 1);
        assert!(value["errors"].as_array().unwrap().is_empty());
    }
}
