use axum::{extract::State, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::metrics::Metrics;

pub const BANNER: &str = "feedcast is running";

#[derive(Debug, Serialize)]
pub struct HealthResp {
    pub status: &'static str,
    pub timestamp: String,
}

/// Liveness router for the hosting platform: `/` and `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(|| async { BANNER }))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

/// Same as [`router`], plus `/metrics` from an installed recorder.
pub fn router_with_metrics(metrics: &Metrics) -> Router {
    let scrape = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics.handle.clone());
    router().merge(scrape)
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

async fn health() -> Json<HealthResp> {
    Json(HealthResp {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
