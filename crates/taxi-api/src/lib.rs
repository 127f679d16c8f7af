//! # taxi-api: Axum API Services for the Taxi Fleet
//!
//! Manufacturer, car and driver management behind session login, built on
//! Axum/Tower/Tokio with optional Postgres write-through persistence.
//!
//! ## API Surface
//!
//! | Prefix                 | Module                        | Auth      |
//! |------------------------|-------------------------------|-----------|
//! | `/`                    | [`routes::index`]             | login     |
//! | `/manufacturers/*`     | [`routes::manufacturers`]     | login     |
//! | `/cars/*`              | [`routes::cars`]              | login     |
//! | `/drivers/*`           | [`routes::drivers`]           | login     |
//! | `/accounts/*`          | [`routes::accounts`]          | public    |
//! | `/health/*`            | probes                        | public    |
//! | `/metrics`             | [`middleware::metrics`]       | public    |
//! | `/openapi.json`        | [`openapi`]                   | public    |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → LoginRequired (fleet routes only) → Handler
//! ```

pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod pagination;
pub mod routes;
pub mod session;
pub mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::{metrics_middleware, prometheus_metrics, ApiMetrics};

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, `/metrics`, `/openapi.json` and the account routes are
/// mounted outside the login-required middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new(state.config.metrics_enabled);

    // `route_layer` keeps unknown paths a plain 404 instead of a login redirect.
    let fleet = Router::new()
        .merge(routes::index::router())
        .merge(routes::manufacturers::router())
        .merge(routes::cars::router())
        .merge(routes::drivers::router())
        .route_layer(from_fn_with_state(state.clone(), auth::require_login));

    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(routes::accounts::router())
        .merge(openapi::router());

    let mut router = Router::new().merge(public).merge(fleet);

    if metrics.is_enabled() {
        router = router
            .route("/metrics", get(prometheus_metrics))
            .layer(from_fn(metrics_middleware));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics))
        .with_state(state)
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: the stores answer and, when configured, the database
/// accepts a query. Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.manufacturers.len();
    let _ = state.drivers.len();
    let _ = state.cars.len();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "database health check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
