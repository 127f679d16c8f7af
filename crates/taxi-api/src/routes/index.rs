//! Home page: fleet counts and the session's visit counter.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::SessionToken;
use crate::error::AppError;
use crate::state::AppState;

/// Counts shown on the home page.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IndexView {
    pub num_drivers: usize,
    pub num_cars: usize,
    pub num_manufacturers: usize,
    /// Home page visits in this session, including this one.
    pub num_visits: u64,
}

/// Build the index router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// GET / - Fleet counts and visit counter.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Fleet counts", body = IndexView),
        (status = 302, description = "Not logged in; redirect to login"),
    ),
    tag = "index"
)]
pub(crate) async fn index(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<Json<IndexView>, AppError> {
    let num_visits = state
        .sessions
        .record_visit(&token)
        .ok_or_else(|| AppError::Unauthorized("session has ended".to_string()))?;

    Ok(Json(IndexView {
        num_drivers: state.drivers.len(),
        num_cars: state.cars.len(),
        num_manufacturers: state.manufacturers.len(),
        num_visits,
    }))
}
