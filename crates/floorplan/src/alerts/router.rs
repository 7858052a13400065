use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{Alert, AlertId, SeverityCounts};
use super::generator::{AlertGenerator, CycleSummary};
use super::inbox::AlertInbox;
use super::store::AlertStore;
use crate::clock::Clock;
use crate::error::AppError;
use crate::ledger::domain::DealerId;
use crate::ledger::store::LedgerStore;

/// How the external trigger endpoint runs the cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSettings {
    /// Shared secret expected as `Authorization: Bearer <secret>`. Without one the trigger is
    /// disabled.
    pub secret: Option<String>,
    pub accrue_interest: bool,
}

pub struct AlertRoutes<S, C, A> {
    pub generator: AlertGenerator<S, C, A>,
    pub inbox: AlertInbox<A>,
    pub trigger: TriggerSettings,
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub dealer_id: String,
    #[serde(default)]
    pub include_dismissed: bool,
}

#[derive(Debug, Serialize)]
pub struct AlertListView {
    pub dealer_id: DealerId,
    pub counts: SeverityCounts,
    pub alerts: Vec<Alert>,
}

pub fn alert_router<S, C, A>(routes: Arc<AlertRoutes<S, C, A>>) -> Router
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    Router::new()
        .route("/api/v1/floor-plans/alerts", get(list_handler::<S, C, A>))
        .route(
            "/api/v1/floor-plans/alerts/run",
            post(run_handler::<S, C, A>),
        )
        .route(
            "/api/v1/floor-plans/alerts/:alert_id/read",
            post(read_handler::<S, C, A>),
        )
        .route(
            "/api/v1/floor-plans/alerts/:alert_id/dismiss",
            post(dismiss_handler::<S, C, A>),
        )
        .route(
            "/api/v1/floor-plans/alerts/:alert_id/action",
            post(action_handler::<S, C, A>),
        )
        .with_state(routes)
}

pub(crate) async fn list_handler<S, C, A>(
    State(routes): State<Arc<AlertRoutes<S, C, A>>>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<AlertListView>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    let dealer_id = DealerId(query.dealer_id);
    let alerts = routes.inbox.list(&dealer_id, query.include_dismissed)?;
    let counts = SeverityCounts::tally(&alerts);
    Ok(Json(AlertListView {
        dealer_id,
        counts,
        alerts,
    }))
}

async fn read_handler<S, C, A>(
    State(routes): State<Arc<AlertRoutes<S, C, A>>>,
    Path(alert_id): Path<AlertId>,
) -> Result<Json<Alert>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    Ok(Json(routes.inbox.mark_read(alert_id)?))
}

async fn dismiss_handler<S, C, A>(
    State(routes): State<Arc<AlertRoutes<S, C, A>>>,
    Path(alert_id): Path<AlertId>,
) -> Result<Json<Alert>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    Ok(Json(routes.inbox.dismiss(alert_id)?))
}

async fn action_handler<S, C, A>(
    State(routes): State<Arc<AlertRoutes<S, C, A>>>,
    Path(alert_id): Path<AlertId>,
) -> Result<Json<Alert>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    Ok(Json(routes.inbox.mark_action_taken(alert_id)?))
}

pub(crate) async fn run_handler<S, C, A>(
    State(routes): State<Arc<AlertRoutes<S, C, A>>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<CycleSummary>), AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    authorize(&routes.trigger, &headers)?;

    let generator = routes.generator.clone();
    let accrue_interest = routes.trigger.accrue_interest;
    let summary = tokio::task::spawn_blocking(move || generator.run_cycle(accrue_interest))
        .await
        .map_err(|err| AppError::Task(err.to_string()))??;
    Ok((StatusCode::OK, Json(summary)))
}

fn authorize(trigger: &TriggerSettings, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(secret) = trigger.secret.as_deref().filter(|secret| !secret.is_empty()) else {
        return Err(AppError::Unauthorized("alert trigger is not configured"));
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    match presented {
        Some(token) if token == secret => Ok(()),
        _ => Err(AppError::Unauthorized("invalid alert trigger credentials")),
    }
}
