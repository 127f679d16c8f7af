//! # Extraction Helpers
//!
//! Handlers take extractor results as `Result<_, Rejection>` and pass them
//! through these helpers, so malformed input becomes an [`AppError`] with
//! the standard body instead of axum's plain-text rejection.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum_extra::extract::{Form, FormRejection};

use crate::error::AppError;

/// Extract a form-encoded body, mapping deserialization errors to
/// [`AppError::BadRequest`].
///
/// Repeated keys (`drivers=1&drivers=2`) deserialize into `Vec` fields.
pub fn extract_form<T>(result: Result<Form<T>, FormRejection>) -> Result<T, AppError> {
    result
        .map(|Form(v)| v)
        .map_err(|err| AppError::BadRequest(err.to_string()))
}

/// Extract query parameters, mapping deserialization errors to
/// [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a numeric record id from the path.
///
/// A segment that is not an integer names no record, so it is a 404.
pub fn extract_id(result: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    result
        .map(|Path(id)| id)
        .map_err(|err| AppError::NotFound(err.body_text()))
}
