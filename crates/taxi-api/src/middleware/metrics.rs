//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware through the `metrics` facade. Fleet gauges (drivers, cars,
//! manufacturers, sessions) are updated on each `/metrics` scrape (pull
//! model), then the Prometheus recorder renders everything in text
//! exposition format.
//!
//! The recorder is process-global, so it is installed at most once no matter
//! how many routers are built.
//!
//! The `path` label is the matched route template (`/cars/{id}`), or
//! [`UNMATCHED_PATH`] for requests no route answered, so the label set is
//! bounded by the route table.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// `path` label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

static RECORDER: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Handle to the Prometheus recorder, if metrics are enabled.
#[derive(Clone)]
pub struct ApiMetrics {
    handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl ApiMetrics {
    /// Install the global recorder (first call only) when `enabled`.
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }
        let handle = RECORDER
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install Prometheus recorder, metrics disabled");
                    None
                }
            })
            .clone();
        Self { handle }
    }

    /// A metrics handle that records nothing and serves no scrape endpoint.
    pub fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Record request count, latency and errors for every request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = route_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed = start.elapsed().as_secs_f64();

    metrics::counter!(
        "taxi_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!(
        "taxi_http_request_duration_seconds",
        "method" => method.clone(),
        "path" => path.clone(),
    )
    .record(elapsed);
    if status >= 400 {
        metrics::counter!(
            "taxi_http_errors_total",
            "method" => method,
            "path" => path,
            "status" => status.to_string(),
        )
        .increment(1);
    }

    response
}

/// GET /metrics: Prometheus scrape endpoint.
pub async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Response {
    metrics::gauge!("taxi_drivers_total").set(state.drivers.len() as f64);
    metrics::gauge!("taxi_cars_total").set(state.cars.len() as f64);
    metrics::gauge!("taxi_manufacturers_total").set(state.manufacturers.len() as f64);
    metrics::gauge!("taxi_sessions_active").set(state.sessions.len() as f64);

    match metrics.render() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_PATH.to_string(), |p| p.as_str().to_string())
}
