//! JSON error envelope for API responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;
use zonegate_common::Error;

/// Wrapper rendering [`zonegate_common::Error`] as the enveloped JSON
/// the API speaks: `{"success": false, "error": ..., "code": ...}`
#[derive(Debug)]
pub struct ApiError(pub Error);

/// Result alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self(Error::Validation(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(Error::NotFound(message.into()))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self(Error::Conflict(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(Error::PermissionDenied(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("API error: {}", self.0);
        }

        let body = json!({
            "success": false,
            "error": self.0.to_string(),
            "code": self.0.code(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_maps_to_400_with_envelope() {
        let response = ApiError::validation("ttl out of range").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["error"].as_str().unwrap().contains("ttl out of range"));
    }

    #[tokio::test]
    async fn conflict_and_forbidden_keep_their_statuses() {
        let conflict = ApiError::conflict("taken").into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let forbidden = ApiError::forbidden("wrong key").into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let body = body_json(forbidden).await;
        assert_eq!(body["code"], "FORBIDDEN");
    }
}
