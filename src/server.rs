//! HTTP router: the detector middleware in front of a page handler that
//! echoes the resolved context.

use axum::{
    extract::{Request, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::metrics::MetricsReport;
use crate::middleware::{context_of, detector_middleware, DetectorState};

pub const METRICS_PATH: &str = "/_i18n/metrics";

pub fn build_router(state: DetectorState) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .fallback(page_handler)
        .layer(middleware::from_fn_with_state(state.clone(), detector_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn metrics_handler(State(state): State<DetectorState>) -> Json<MetricsReport> {
    Json(state.detector.metrics().report())
}

async fn page_handler(req: Request) -> Json<Value> {
    Json(json!({
        "path": req.uri().path(),
        "i18n": context_of(&req),
    }))
}
