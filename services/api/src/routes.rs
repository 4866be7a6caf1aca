use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use charity_finder::discovery::{
    discovery_router, CharityEnricher, CharityFinder, MapsLookup, PlaceSearch,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_discovery_routes<P, E, L>(
    finder: Arc<CharityFinder<P, E>>,
    lookup: Arc<L>,
) -> axum::Router
where
    P: PlaceSearch + ?Sized + 'static,
    E: CharityEnricher + ?Sized + 'static,
    L: MapsLookup + ?Sized + 'static,
{
    discovery_router(finder, lookup)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
