use crate::infra::{AppState, FloorPlanEngine};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use floorplan::alerts::{alert_router, AlertGenerator, AlertRoutes, TriggerSettings};
use floorplan::clock::Clock;
use floorplan::dashboard::dashboard_router;
use floorplan::ledger::ledger_router;
use floorplan::store::InMemoryStore;
use serde_json::json;
use std::sync::Arc;

/// Every floor plan route plus the health and metrics endpoints.
pub(crate) fn with_floor_plan_routes<C>(
    engine: &FloorPlanEngine<C>,
    generator: AlertGenerator<InMemoryStore, C, InMemoryStore>,
    trigger: TriggerSettings,
) -> Router
where
    C: Clock + 'static,
{
    let alerts = Arc::new(AlertRoutes {
        generator,
        inbox: engine.inbox.clone(),
        trigger,
    });

    Router::new()
        .merge(ledger_router(engine.ledger.clone()))
        .merge(alert_router(alerts))
        .merge(dashboard_router(Arc::clone(&engine.dashboard)))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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
