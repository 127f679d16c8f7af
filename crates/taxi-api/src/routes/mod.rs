//! # API Route Modules
//!
//! - `accounts`: login and logout (public).
//! - `index`: fleet counts and the per-session visit counter.
//! - `manufacturers`, `cars`, `drivers`: list, detail, create, update and
//!   delete for each record kind.
//!
//! Every route except `accounts` sits behind the login-required middleware.
//! Successful form submissions answer with a 302 redirect; invalid ones
//! with a 422 carrying the per-field messages.

pub mod accounts;
pub mod cars;
pub mod drivers;
pub mod index;
pub mod manufacturers;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::state::{AppState, Rollback};

/// A 302 redirect to `location`.
pub fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

/// Roll back the in-memory change whose database write failed, log it and
/// turn it into the error returned to the client.
pub(crate) fn persist_failed(state: &AppState, undo: Rollback, error: sqlx::Error) -> AppError {
    let (record, id) = undo.target();
    tracing::error!(record, id, error = %error, "failed to persist to database");
    state.roll_back(undo);
    AppError::Internal(format!("{record} could not be saved"))
}
