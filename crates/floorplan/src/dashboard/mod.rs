//! Read-only dealer rollups over active accounts and units, recomputed on every request.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::alerts::{AlertInbox, AlertStore, SeverityCounts};
use crate::clock::Clock;
use crate::error::AppError;
use crate::finance::{self, AgingStatus, CurtailmentStatus, RatedBalance};
use crate::ledger::domain::{AccountId, AccountStatus, DealerId};
use crate::ledger::service::{FloorPlanLedger, LedgerError};
use crate::ledger::store::LedgerStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgingBreakdown {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

/// One credit line's share of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRollup {
    pub account_id: AccountId,
    pub provider_name: String,
    pub credit_limit: Decimal,
    pub available_credit: Decimal,
    pub utilization: Decimal,
    pub units_floored: usize,
    pub current_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub dealer_id: DealerId,
    pub as_of: NaiveDate,
    pub total_credit_limit: Decimal,
    pub total_available_credit: Decimal,
    pub total_current_balance: Decimal,
    pub total_floored_principal: Decimal,
    pub credit_utilization: Decimal,
    pub units_floored: usize,
    pub units_past_due: usize,
    /// Units whose next curtailment is due today or within the upcoming window.
    pub upcoming_curtailments: usize,
    pub unpaid_interest: Decimal,
    pub monthly_interest_estimate: Decimal,
    pub aging: AgingBreakdown,
    pub alerts: SeverityCounts,
    pub accounts: Vec<AccountRollup>,
}

pub struct DashboardAggregator<S, C, A> {
    ledger: FloorPlanLedger<S, C>,
    inbox: AlertInbox<A>,
}

impl<S, C, A> Clone for DashboardAggregator<S, C, A> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            inbox: self.inbox.clone(),
        }
    }
}

impl<S, C, A> DashboardAggregator<S, C, A>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    pub fn new(ledger: FloorPlanLedger<S, C>, inbox: AlertInbox<A>) -> Self {
        Self { ledger, inbox }
    }

    pub fn summary(&self, dealer_id: &DealerId) -> Result<DashboardSummary, AppError> {
        let today = self.ledger.today();
        let accounts = self
            .ledger
            .accounts(Some(dealer_id), Some(AccountStatus::Active))?;
        let units = self.ledger.floored_units(Some(dealer_id))?;
        let alerts = self.inbox.severity_counts(dealer_id)?;

        let mut summary = DashboardSummary {
            dealer_id: dealer_id.clone(),
            as_of: today,
            total_credit_limit: Decimal::ZERO,
            total_available_credit: Decimal::ZERO,
            total_current_balance: Decimal::ZERO,
            total_floored_principal: Decimal::ZERO,
            credit_utilization: Decimal::ZERO,
            units_floored: units.len(),
            units_past_due: 0,
            upcoming_curtailments: 0,
            unpaid_interest: Decimal::ZERO,
            monthly_interest_estimate: Decimal::ZERO,
            aging: AgingBreakdown::default(),
            alerts,
            accounts: Vec::with_capacity(accounts.len()),
        };

        for entry in &accounts {
            let account = &entry.account;
            summary.total_credit_limit += account.credit_limit;
            summary.total_available_credit += account.available_credit;
            let on_account = units
                .iter()
                .filter(|floored| floored.unit.account_id == account.id);
            summary.accounts.push(AccountRollup {
                account_id: account.id,
                provider_name: entry.provider_name.clone(),
                credit_limit: account.credit_limit,
                available_credit: account.available_credit,
                utilization: account.utilization(),
                units_floored: on_account.clone().count(),
                current_balance: on_account.map(|floored| floored.unit.current_balance).sum(),
            });
        }
        summary.credit_utilization = finance::credit_utilization(
            summary.total_credit_limit,
            summary.total_available_credit,
        );

        for floored in &units {
            let unit = &floored.unit;
            summary.total_current_balance += unit.current_balance;
            summary.total_floored_principal += unit.floor_amount;
            summary.unpaid_interest += unit.unpaid_interest();
            match unit.curtailment_status(today) {
                Some(CurtailmentStatus::PastDue) => summary.units_past_due += 1,
                Some(CurtailmentStatus::Due | CurtailmentStatus::Upcoming) => {
                    summary.upcoming_curtailments += 1
                }
                _ if unit.is_past_due => summary.units_past_due += 1,
                _ => {}
            }
            match unit.aging_status(today) {
                AgingStatus::Healthy => summary.aging.healthy += 1,
                AgingStatus::Warning => summary.aging.warning += 1,
                AgingStatus::Critical => summary.aging.critical += 1,
            }
        }
        summary.monthly_interest_estimate =
            finance::monthly_interest_estimate(units.iter().map(|floored| RatedBalance {
                balance: floored.unit.current_balance,
                annual_rate_percent: floored.account.interest_rate,
            }));

        Ok(summary)
    }
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub dealer_id: String,
}

pub fn dashboard_router<S, C, A>(aggregator: Arc<DashboardAggregator<S, C, A>>) -> Router
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/floor-plans/dashboard",
            get(dashboard_handler::<S, C, A>),
        )
        .with_state(aggregator)
}

async fn dashboard_handler<S, C, A>(
    State(aggregator): State<Arc<DashboardAggregator<S, C, A>>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, AppError>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    if query.dealer_id.trim().is_empty() {
        return Err(LedgerError::Validation("dealer_id is required".to_string()).into());
    }
    Ok(Json(aggregator.summary(&DealerId(query.dealer_id))?))
}
