//! API errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use ward_core::{CensusError, ValidationErrors};

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    #[schema(value_type = String)]
    pub code: &'static str,
    pub message: String,
    /// Field id to message, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<ValidationErrors>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("partial archive: {0}")]
    PartialArchive(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, fields) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Missing or invalid x-api-key header".to_string(),
                None,
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail, None),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                "One or more fields are invalid".to_string(),
                Some(errors),
            ),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "INVALID_TRANSITION", detail, None),
            ApiError::PartialArchive(detail) => {
                tracing::error!(%detail, "partial archive");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PARTIAL_ARCHIVE",
                    detail,
                    None,
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                fields,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CensusError> for ApiError {
    fn from(err: CensusError) -> Self {
        match err {
            CensusError::Validation(errors) => ApiError::Validation(errors),
            CensusError::PermissionDenied { .. } | CensusError::UnitMismatch { .. } => {
                ApiError::Forbidden(err.to_string())
            }
            CensusError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            CensusError::NotFound(detail) => ApiError::NotFound(detail),
            CensusError::InvalidInput(detail) => ApiError::BadRequest(detail),
            CensusError::PartialArchive { .. } => ApiError::PartialArchive(err.to_string()),
            CensusError::Store(_)
            | CensusError::Serialization(_)
            | CensusError::Deserialization(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use ward_core::validation::Field;
    use ward_core::{Role, StoreError};

    #[tokio::test]
    async fn test_validation_error_carries_fields() {
        let mut errors = ValidationErrors::new();
        errors.insert(Field::Name, "Name must be at least 3 characters.");

        let response = ApiError::from(CensusError::Validation(errors)).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(
            json["error"]["fields"]["name"],
            "Name must be at least 3 characters."
        );
    }

    #[tokio::test]
    async fn test_store_failure_hides_detail() {
        let err = CensusError::Store(StoreError::Unavailable("disk on fire".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["message"], "An internal error occurred");
        assert!(json["error"].get("fields").is_none());
    }

    #[test]
    fn test_status_mapping() {
        let denied = CensusError::PermissionDenied {
            role: Role::Staff,
            action: "create",
        };
        assert_eq!(
            ApiError::from(denied).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(CensusError::NotFound("x".into()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        let partial = CensusError::PartialArchive {
            id: "x".into(),
            source: StoreError::Unavailable("down".into()),
        };
        assert_eq!(
            ApiError::from(partial).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
