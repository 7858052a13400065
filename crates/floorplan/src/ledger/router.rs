use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    Account, AccountId, AccountStatus, AccountWithProvider, DealerId, NewAccount, NewProvider,
    NewUnit, Payment, PaymentRequest, PayoffQuote, Provider, ProviderId, ProviderUpdate,
    UnitFilter, UnitFloorPlan, UnitId,
};
use super::export::write_payments_csv;
use super::service::{FloorPlanLedger, PaymentReceipt};
use super::store::LedgerStore;
use crate::clock::Clock;
use crate::error::AppError;
use crate::finance::{AgingStatus, CurtailmentStatus};

/// Unit with the status fields derived from today's date.
#[derive(Debug, Clone, Serialize)]
pub struct UnitView {
    #[serde(flatten)]
    pub unit: UnitFloorPlan,
    pub days_floored: i64,
    pub aging_status: AgingStatus,
    pub curtailment_status: Option<CurtailmentStatus>,
    pub unpaid_interest: Decimal,
}

impl UnitView {
    pub fn new(unit: UnitFloorPlan, today: NaiveDate) -> Self {
        Self {
            days_floored: unit.days_floored(today),
            aging_status: unit.aging_status(today),
            curtailment_status: unit.curtailment_status(today),
            unpaid_interest: unit.unpaid_interest(),
            unit,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountQuery {
    #[serde(default)]
    pub dealer_id: Option<String>,
    #[serde(default)]
    pub status: Option<AccountStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseRequest {
    #[serde(default)]
    pub close_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayoffRequest {
    #[serde(default)]
    pub payoff_date: Option<NaiveDate>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteQuery {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub fee: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub transfer_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentsQuery {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccrueRequest {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// HTTP surface of the ledger under `/api/v1/floor-plans`.
pub fn ledger_router<S, C>(ledger: FloorPlanLedger<S, C>) -> Router
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route(
            "/api/v1/floor-plans/providers",
            post(create_provider::<S, C>).get(list_providers::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/providers/:provider_id",
            get(get_provider::<S, C>).put(update_provider::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/accounts",
            post(open_account::<S, C>).get(list_accounts::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/accounts/:account_id",
            get(get_account::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/accounts/:account_id/suspend",
            post(suspend_account::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/accounts/:account_id/reactivate",
            post(reactivate_account::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/accounts/:account_id/close",
            post(close_account::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/units",
            post(open_unit::<S, C>).get(list_units::<S, C>),
        )
        .route("/api/v1/floor-plans/units/:unit_id", get(get_unit::<S, C>))
        .route(
            "/api/v1/floor-plans/units/:unit_id/payments",
            get(list_payments::<S, C>).post(record_payment::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/units/:unit_id/payoff",
            post(payoff::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/units/:unit_id/payoff-quote",
            get(payoff_quote::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/units/:unit_id/transfer",
            post(transfer_unit::<S, C>),
        )
        .route(
            "/api/v1/floor-plans/units/:unit_id/accrue",
            post(accrue_interest::<S, C>),
        )
        .with_state(ledger)
}

async fn create_provider<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Json(request): Json<NewProvider>,
) -> Result<(StatusCode, Json<Provider>), AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok((StatusCode::CREATED, Json(ledger.create_provider(request)?)))
}

async fn list_providers<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
) -> Result<Json<Vec<Provider>>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok(Json(ledger.providers()?))
}

async fn get_provider<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(provider_id): Path<ProviderId>,
) -> Result<Json<Provider>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok(Json(ledger.provider(provider_id)?))
}

async fn update_provider<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(provider_id): Path<ProviderId>,
    Json(update): Json<ProviderUpdate>,
) -> Result<Json<Provider>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok(Json(ledger.update_provider(provider_id, update)?))
}

async fn open_account<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Json(request): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>), AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok((StatusCode::CREATED, Json(ledger.open_account(request)?)))
}

async fn list_accounts<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Query(query): Query<AccountQuery>,
) -> Result<Json<Vec<AccountWithProvider>>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let dealer_id = query.dealer_id.map(DealerId);
    Ok(Json(ledger.accounts(dealer_id.as_ref(), query.status)?))
}

async fn get_account<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<AccountWithProvider>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok(Json(ledger.account(account_id)?))
}

async fn suspend_account<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok(Json(ledger.suspend_account(account_id)?))
}

async fn reactivate_account<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok(Json(ledger.reactivate_account(account_id)?))
}

async fn close_account<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(account_id): Path<AccountId>,
    request: Option<Json<CloseRequest>>,
) -> Result<Json<Account>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let close_date = request
        .and_then(|Json(body)| body.close_date)
        .unwrap_or_else(|| ledger.today());
    Ok(Json(ledger.close_account(account_id, close_date)?))
}

async fn open_unit<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Json(request): Json<NewUnit>,
) -> Result<(StatusCode, Json<UnitView>), AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let unit = ledger.open_unit(request)?;
    Ok((StatusCode::CREATED, Json(UnitView::new(unit, ledger.today()))))
}

async fn list_units<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Query(filter): Query<UnitFilter>,
) -> Result<Json<Vec<UnitView>>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let today = ledger.today();
    let units = ledger
        .list_units(&filter)?
        .into_iter()
        .map(|unit| UnitView::new(unit, today))
        .collect();
    Ok(Json(units))
}

async fn get_unit<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(unit_id): Path<UnitId>,
) -> Result<Json<UnitView>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let unit = ledger.get_unit(unit_id)?;
    Ok(Json(UnitView::new(unit, ledger.today())))
}

async fn list_payments<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(unit_id): Path<UnitId>,
    Query(query): Query<PaymentsQuery>,
) -> Result<Response, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let payments: Vec<Payment> = ledger.payments(unit_id)?;
    if query.format.as_deref() == Some("csv") {
        let mut buffer = Vec::new();
        write_payments_csv(&mut buffer, &payments)?;
        return Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            buffer,
        )
            .into_response());
    }
    Ok(Json(payments).into_response())
}

async fn record_payment<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(unit_id): Path<UnitId>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentReceipt>), AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    Ok((
        StatusCode::CREATED,
        Json(ledger.record_payment(unit_id, request)?),
    ))
}

async fn payoff<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(unit_id): Path<UnitId>,
    request: Option<Json<PayoffRequest>>,
) -> Result<(StatusCode, Json<PaymentReceipt>), AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let PayoffRequest {
        payoff_date,
        fee,
        reference,
    } = request.map(|Json(body)| body).unwrap_or_default();
    let payoff_date = payoff_date.unwrap_or_else(|| ledger.today());
    let receipt = ledger.payoff(unit_id, payoff_date, fee, reference)?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn payoff_quote<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(unit_id): Path<UnitId>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<PayoffQuote>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let as_of = query.as_of.unwrap_or_else(|| ledger.today());
    Ok(Json(ledger.payoff_quote(unit_id, as_of, query.fee)?))
}

async fn transfer_unit<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(unit_id): Path<UnitId>,
    request: Option<Json<TransferRequest>>,
) -> Result<Json<UnitView>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let today = ledger.today();
    let transfer_date = request
        .and_then(|Json(body)| body.transfer_date)
        .unwrap_or(today);
    let unit = ledger.transfer_unit(unit_id, transfer_date)?;
    Ok(Json(UnitView::new(unit, today)))
}

async fn accrue_interest<S, C>(
    State(ledger): State<FloorPlanLedger<S, C>>,
    Path(unit_id): Path<UnitId>,
    request: Option<Json<AccrueRequest>>,
) -> Result<Json<UnitView>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    let today = ledger.today();
    let as_of = request.and_then(|Json(body)| body.as_of).unwrap_or(today);
    let unit = ledger.accrue_interest(unit_id, as_of)?;
    Ok(Json(UnitView::new(unit, today)))
}
