//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Form validation failures carry the per-field message map in `details`;
//! internal errors are logged and replaced by a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use taxi_core::FormErrors;
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Field name to messages, present for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A form failed validation (422).
    #[error("validation error: {0}")]
    Validation(FormErrors),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No authenticated driver in the request context (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                ("An internal error occurred".to_string(), None)
            }
            Self::Validation(errors) => (
                "The submitted form is invalid".to_string(),
                serde_json::to_value(errors).ok(),
            ),
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<FormErrors> for AppError {
    fn from(errors: FormErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Validation(FormErrors::single("name", "bad")),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err}");
        }
    }

    #[tokio::test]
    async fn validation_response_carries_field_messages() {
        let mut errors = FormErrors::new();
        errors.add("license_number", "Last 5 characters should be digits");
        let (status, body) = response_parts(AppError::from(errors)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        let details = body.error.details.unwrap();
        assert_eq!(
            details["license_number"][0],
            "Last 5 characters should be digits"
        );
    }

    #[tokio::test]
    async fn not_found_has_no_details() {
        let (status, body) = response_parts(AppError::NotFound("car 9".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.error.message.contains("car 9"));
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("db connection failed".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[test]
    fn error_body_omits_empty_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "TEST".to_string(),
                message: "test message".to_string(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("details"));
    }
}
