use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::domain::{
    Account, AccountId, AccountStatus, AccountWithProvider, DealerId, FlooredUnit,
    InterestCalculation, ListingId, NewAccount, NewProvider, NewUnit, Payment, PaymentId,
    PaymentRequest, PaymentType, PayoffQuote, Provider, ProviderId, ProviderUpdate, UnitFilter,
    UnitFloorPlan, UnitId, UnitStatus,
};
use super::store::{LedgerReader, LedgerStore, LedgerWriter, StoreError};
use crate::clock::Clock;
use crate::finance;
use crate::scheduler::CurtailmentScheduler;

/// Subsequent curtailments fall every 30 days unless the account says otherwise.
pub const DEFAULT_SUBSEQUENT_CURTAILMENT_DAYS: i64 = 30;
/// Longest accepted curtailment cadence, in days.
pub const MAX_CURTAILMENT_DAYS: i64 = 3650;
/// Largest accepted monetary input (credit limits, floor amounts, payments, fees).
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

/// Floor plan ledger: owns providers, accounts, units, and payments, and keeps their balances
/// consistent. Every mutating operation runs as one store transaction.
pub struct FloorPlanLedger<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for FloorPlanLedger<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Payment as persisted together with the unit state it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub unit: UnitFloorPlan,
}

/// Outcome of a batch interest accrual pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccrualSummary {
    pub as_of: Option<NaiveDate>,
    pub units_accrued: usize,
    pub interest_booked: Decimal,
    pub units_flagged_past_due: usize,
    pub failures: usize,
}

impl<S, C> FloorPlanLedger<S, C>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn create_provider(&self, request: NewProvider) -> Result<Provider, LedgerError> {
        validate_name(&request.name)?;
        validate_percent("default_interest_rate", request.default_interest_rate)?;
        validate_percent(
            "default_curtailment_percent",
            request.default_curtailment_percent,
        )?;
        validate_days("default_curtailment_days", request.default_curtailment_days)?;

        let now = self.clock.now();
        let provider = Provider {
            id: ProviderId::new(),
            name: request.name.trim().to_string(),
            default_interest_rate: request.default_interest_rate,
            default_curtailment_days: request.default_curtailment_days,
            default_curtailment_percent: request.default_curtailment_percent,
            is_active: request.is_active,
            created_at: now,
            updated_at: now,
        };

        self.commit("create_provider", |tx| {
            tx.insert_provider(provider.clone())?;
            Ok(())
        })?;
        info!(provider_id = %provider.id, name = %provider.name, "floor plan provider created");
        Ok(provider)
    }

    pub fn update_provider(
        &self,
        provider_id: ProviderId,
        update: ProviderUpdate,
    ) -> Result<Provider, LedgerError> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(rate) = update.default_interest_rate {
            validate_percent("default_interest_rate", rate)?;
        }
        if let Some(percent) = update.default_curtailment_percent {
            validate_percent("default_curtailment_percent", percent)?;
        }
        if let Some(days) = update.default_curtailment_days {
            validate_days("default_curtailment_days", days)?;
        }

        let now = self.clock.now();
        self.commit("update_provider", |tx| {
            let mut provider = tx
                .provider(provider_id)?
                .ok_or(LedgerError::ProviderNotFound(provider_id))?;
            if let Some(name) = update.name {
                provider.name = name.trim().to_string();
            }
            if let Some(rate) = update.default_interest_rate {
                provider.default_interest_rate = rate;
            }
            if let Some(days) = update.default_curtailment_days {
                provider.default_curtailment_days = days;
            }
            if let Some(percent) = update.default_curtailment_percent {
                provider.default_curtailment_percent = percent;
            }
            if let Some(active) = update.is_active {
                provider.is_active = active;
            }
            provider.updated_at = now;
            tx.update_provider(provider.clone())?;
            Ok(provider)
        })
    }

    pub fn provider(&self, provider_id: ProviderId) -> Result<Provider, LedgerError> {
        self.store.read(|reader| {
            reader
                .provider(provider_id)?
                .ok_or(LedgerError::ProviderNotFound(provider_id))
        })
    }

    pub fn providers(&self) -> Result<Vec<Provider>, LedgerError> {
        self.store.read(|reader| Ok(reader.providers()?))
    }

    /// Open a credit line for a dealer, inheriting unspecified terms from the provider.
    pub fn open_account(&self, request: NewAccount) -> Result<Account, LedgerError> {
        if request.dealer_id.0.trim().is_empty() {
            return Err(LedgerError::Validation("dealer_id is required".to_string()));
        }
        validate_positive("credit_limit", request.credit_limit)?;
        let now = self.clock.now();

        let account = self.commit("open_account", |tx| {
            let provider = tx
                .provider(request.provider_id)?
                .ok_or(LedgerError::ProviderNotFound(request.provider_id))?;
            if !provider.is_active {
                return Err(LedgerError::ProviderInactive(provider.id));
            }

            let account = Account {
                id: AccountId::new(),
                dealer_id: request.dealer_id.clone(),
                provider_id: provider.id,
                credit_limit: request.credit_limit,
                available_credit: request.credit_limit,
                interest_rate: request
                    .interest_rate
                    .unwrap_or(provider.default_interest_rate),
                interest_type: request.interest_type,
                interest_calculation: request.interest_calculation,
                curtailment_days: request
                    .curtailment_days
                    .unwrap_or(provider.default_curtailment_days),
                curtailment_percent: request
                    .curtailment_percent
                    .unwrap_or(provider.default_curtailment_percent),
                subsequent_curtailment_days: request
                    .subsequent_curtailment_days
                    .unwrap_or(DEFAULT_SUBSEQUENT_CURTAILMENT_DAYS),
                floor_fee_percent: request.floor_fee_percent.unwrap_or(Decimal::ZERO),
                payoff_fee: request.payoff_fee.unwrap_or(Decimal::ZERO),
                status: AccountStatus::Active,
                open_date: request.open_date,
                close_date: None,
                created_at: now,
                updated_at: now,
            };
            validate_account_terms(&account)?;
            tx.insert_account(account.clone())?;
            Ok(account)
        })?;

        info!(
            account_id = %account.id,
            dealer_id = %account.dealer_id,
            credit_limit = %account.credit_limit,
            "floor plan account opened"
        );
        Ok(account)
    }

    pub fn account(&self, account_id: AccountId) -> Result<AccountWithProvider, LedgerError> {
        self.store.read(|reader| {
            let account = reader
                .account(account_id)?
                .ok_or(LedgerError::AccountNotFound(account_id))?;
            let provider_name = reader
                .provider(account.provider_id)?
                .map(|provider| provider.name)
                .unwrap_or_default();
            Ok(AccountWithProvider {
                account,
                provider_name,
            })
        })
    }

    pub fn accounts(
        &self,
        dealer_id: Option<&DealerId>,
        status: Option<AccountStatus>,
    ) -> Result<Vec<AccountWithProvider>, LedgerError> {
        self.store
            .read(|reader| Ok(reader.accounts(dealer_id, status)?))
    }

    pub fn suspend_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.transition_account(account_id, AccountStatus::Suspended, None)
    }

    pub fn reactivate_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.transition_account(account_id, AccountStatus::Active, None)
    }

    /// Close a credit line for good. Units already floored keep accepting payments.
    pub fn close_account(
        &self,
        account_id: AccountId,
        close_date: NaiveDate,
    ) -> Result<Account, LedgerError> {
        self.transition_account(account_id, AccountStatus::Closed, Some(close_date))
    }

    fn transition_account(
        &self,
        account_id: AccountId,
        next: AccountStatus,
        close_date: Option<NaiveDate>,
    ) -> Result<Account, LedgerError> {
        let now = self.clock.now();
        let account = self.commit("transition_account", |tx| {
            let mut account = tx
                .account(account_id)?
                .ok_or(LedgerError::AccountNotFound(account_id))?;
            if !account.status.can_transition_to(next) {
                return Err(LedgerError::InvalidAccountTransition {
                    from: account.status,
                    to: next,
                });
            }
            account.status = next;
            if close_date.is_some() {
                account.close_date = close_date;
            }
            account.updated_at = now;
            tx.update_account(account.clone())?;
            Ok(account)
        })?;

        info!(
            account_id = %account.id,
            status = account.status.label(),
            "floor plan account status changed"
        );
        Ok(account)
    }

    /// Floor a listing against an account, drawing its floor amount from available credit.
    pub fn open_unit(&self, request: NewUnit) -> Result<UnitFloorPlan, LedgerError> {
        validate_positive("floor_amount", request.floor_amount)?;
        if request.listing_id.0.trim().is_empty() {
            return Err(LedgerError::Validation("listing_id is required".to_string()));
        }
        let now = self.clock.now();

        let unit = self.commit("open_unit", |tx| {
            let mut account = tx
                .account(request.account_id)?
                .ok_or(LedgerError::AccountNotFound(request.account_id))?;
            if account.status != AccountStatus::Active {
                return Err(LedgerError::AccountNotActive(account.id));
            }
            if request.floor_amount > account.available_credit {
                return Err(LedgerError::InsufficientCredit {
                    requested: request.floor_amount,
                    available: account.available_credit,
                });
            }
            if tx.active_unit_for_listing(&request.listing_id)?.is_some() {
                return Err(LedgerError::ListingAlreadyFloored(request.listing_id.clone()));
            }

            let first_due = CurtailmentScheduler::for_account(&account)
                .first_due_date(request.floor_date)
                .ok_or_else(|| out_of_calendar("first curtailment date"))?;
            let floor_fee = request
                .floor_amount
                .checked_mul(account.floor_fee_percent)
                .map(|fee| finance::round_cents(fee / Decimal::ONE_HUNDRED))
                .ok_or_else(|| LedgerError::Validation("floor fee is out of range".to_string()))?;

            let unit = UnitFloorPlan {
                id: UnitId::new(),
                dealer_id: account.dealer_id.clone(),
                account_id: account.id,
                listing_id: request.listing_id.clone(),
                floor_amount: request.floor_amount,
                floor_date: request.floor_date,
                floor_reference: request.reference.clone(),
                current_balance: request.floor_amount,
                total_interest_accrued: floor_fee,
                total_interest_paid: Decimal::ZERO,
                interest_accrued_through: request.floor_date,
                first_curtailment_date: Some(first_due),
                next_curtailment_date: Some(first_due),
                curtailments_paid: 0,
                is_past_due: false,
                payoff_date: None,
                payoff_amount: None,
                payoff_reference: None,
                transfer_date: None,
                status: UnitStatus::Active,
                created_at: now,
                updated_at: now,
            };

            account.available_credit -= request.floor_amount;
            account.updated_at = now;
            tx.insert_unit(unit.clone())?;
            tx.update_account(account)?;
            Ok(unit)
        })?;

        info!(
            unit_id = %unit.id,
            listing_id = %unit.listing_id,
            account_id = %unit.account_id,
            floor_amount = %unit.floor_amount,
            "unit floored"
        );
        Ok(unit)
    }

    pub fn get_unit(&self, unit_id: UnitId) -> Result<UnitFloorPlan, LedgerError> {
        self.store.read(|reader| {
            reader
                .unit(unit_id)?
                .ok_or(LedgerError::UnitNotFound(unit_id))
        })
    }

    pub fn list_units(&self, filter: &UnitFilter) -> Result<Vec<UnitFloorPlan>, LedgerError> {
        self.store.read(|reader| Ok(reader.units(filter)?))
    }

    /// Active units joined with their account and provider.
    pub fn floored_units(
        &self,
        dealer_id: Option<&DealerId>,
    ) -> Result<Vec<FlooredUnit>, LedgerError> {
        self.store.read(|reader| Ok(reader.floored_units(dealer_id)?))
    }

    pub fn payments(&self, unit_id: UnitId) -> Result<Vec<Payment>, LedgerError> {
        self.store.read(|reader| {
            if reader.unit(unit_id)?.is_none() {
                return Err(LedgerError::UnitNotFound(unit_id));
            }
            Ok(reader.payments(unit_id)?)
        })
    }

    /// Apply one payment to a unit and append it to the payment ledger.
    ///
    /// Interest is accrued through the payment date first so principal reductions never erase
    /// interest earned on the prior balance.
    pub fn record_payment(
        &self,
        unit_id: UnitId,
        request: PaymentRequest,
    ) -> Result<PaymentReceipt, LedgerError> {
        validate_positive("amount", request.amount)?;
        self.validate_not_future("payment_date", request.payment_date)?;
        let now = self.clock.now();

        let receipt = self.commit("record_payment", |tx| {
            let (mut unit, mut account) = load_active_unit(tx, unit_id)?;
            accrue_unit(&mut unit, &account, request.payment_date);
            apply_payment(tx, &mut unit, &mut account, request, now)
        })?;

        info!(
            unit_id = %receipt.unit.id,
            payment_type = receipt.payment.payment_type.label(),
            amount = %receipt.payment.amount,
            balance_after = %receipt.payment.balance_after,
            "floor plan payment recorded"
        );
        Ok(receipt)
    }

    /// Settle a unit in full: principal, interest accrued through `payoff_date`, and the payoff
    /// fee (the account's fee when none is given).
    pub fn payoff(
        &self,
        unit_id: UnitId,
        payoff_date: NaiveDate,
        fee: Option<Decimal>,
        reference: Option<String>,
    ) -> Result<PaymentReceipt, LedgerError> {
        if let Some(fee) = fee {
            validate_non_negative("fee", fee)?;
        }
        self.validate_not_future("payoff_date", payoff_date)?;
        let now = self.clock.now();

        let receipt = self.commit("payoff", |tx| {
            let (mut unit, mut account) = load_active_unit(tx, unit_id)?;
            accrue_unit(&mut unit, &account, payoff_date);
            let fee = fee.unwrap_or(account.payoff_fee);
            let amount = finance::payoff_amount(unit.current_balance, unit.unpaid_interest(), fee);
            if amount <= Decimal::ZERO {
                return Err(LedgerError::Validation(
                    "payoff amount must be greater than zero".to_string(),
                ));
            }
            let request = PaymentRequest {
                payment_type: PaymentType::Payoff,
                amount,
                payment_date: payoff_date,
                reference,
                notes: None,
            };
            apply_payment(tx, &mut unit, &mut account, request, now)
        })?;

        info!(
            unit_id = %receipt.unit.id,
            amount = %receipt.payment.amount,
            reference = receipt.payment.reference.as_deref().unwrap_or(""),
            "unit paid off"
        );
        Ok(receipt)
    }

    /// Quote what `payoff` would collect on `as_of`, without persisting any accrual.
    pub fn payoff_quote(
        &self,
        unit_id: UnitId,
        as_of: NaiveDate,
        fee: Option<Decimal>,
    ) -> Result<PayoffQuote, LedgerError> {
        self.store.read(|reader| {
            let unit = reader
                .unit(unit_id)?
                .ok_or(LedgerError::UnitNotFound(unit_id))?;
            if !unit.is_active() {
                return Err(LedgerError::UnitNotActive(unit_id));
            }
            let account = reader
                .account(unit.account_id)?
                .ok_or(LedgerError::AccountNotFound(unit.account_id))?;

            let mut projected = unit.clone();
            accrue_unit(&mut projected, &account, as_of);
            let fee = fee.unwrap_or(account.payoff_fee);
            let unpaid_interest = projected.unpaid_interest();
            Ok(PayoffQuote {
                unit_id,
                as_of,
                principal_balance: projected.current_balance,
                unpaid_interest,
                payoff_fee: fee,
                total: finance::payoff_amount(projected.current_balance, unpaid_interest, fee),
            })
        })
    }

    /// Move a unit off this credit line without a payoff, releasing its floored credit.
    pub fn transfer_unit(
        &self,
        unit_id: UnitId,
        transfer_date: NaiveDate,
    ) -> Result<UnitFloorPlan, LedgerError> {
        let now = self.clock.now();
        let unit = self.commit("transfer_unit", |tx| {
            let (mut unit, mut account) = load_active_unit(tx, unit_id)?;
            unit.status = UnitStatus::Transferred;
            unit.transfer_date = Some(transfer_date);
            unit.next_curtailment_date = None;
            unit.is_past_due = false;
            unit.updated_at = now;
            release_credit(&mut account, unit.floor_amount, now);
            tx.update_unit(unit.clone())?;
            tx.update_account(account)?;
            Ok(unit)
        })?;

        info!(unit_id = %unit.id, "unit transferred off floor plan");
        Ok(unit)
    }

    /// Manually raise or clear a unit's past-due flag.
    pub fn set_past_due(
        &self,
        unit_id: UnitId,
        past_due: bool,
    ) -> Result<UnitFloorPlan, LedgerError> {
        let now = self.clock.now();
        self.commit("set_past_due", |tx| {
            let (mut unit, _) = load_active_unit(tx, unit_id)?;
            unit.is_past_due = past_due;
            unit.updated_at = now;
            tx.update_unit(unit.clone())?;
            Ok(unit)
        })
    }

    /// Book interest on one unit through `as_of`, which may not be later than today.
    pub fn accrue_interest(
        &self,
        unit_id: UnitId,
        as_of: NaiveDate,
    ) -> Result<UnitFloorPlan, LedgerError> {
        self.validate_not_future("as_of", as_of)?;
        let now = self.clock.now();
        self.commit("accrue_interest", |tx| {
            let (mut unit, account) = load_active_unit(tx, unit_id)?;
            if accrue_unit(&mut unit, &account, as_of) > Decimal::ZERO {
                unit.updated_at = now;
            }
            tx.update_unit(unit.clone())?;
            Ok(unit)
        })
    }

    /// Accrue interest and refresh past-due flags across every active unit.
    ///
    /// Each unit commits in its own transaction; a failing unit is logged and skipped.
    pub fn accrue_all(&self, as_of: NaiveDate) -> Result<AccrualSummary, LedgerError> {
        self.validate_not_future("as_of", as_of)?;
        let unit_ids: Vec<UnitId> = self
            .list_units(&UnitFilter {
                status: Some(UnitStatus::Active),
                ..UnitFilter::default()
            })?
            .into_iter()
            .map(|unit| unit.id)
            .collect();
        let now = self.clock.now();
        let mut summary = AccrualSummary {
            as_of: Some(as_of),
            ..AccrualSummary::default()
        };

        for unit_id in unit_ids {
            let outcome = self.commit("accrue_all", |tx| {
                let (mut unit, account) = load_active_unit(tx, unit_id)?;
                let booked = accrue_unit(&mut unit, &account, as_of);
                let flagged = CurtailmentScheduler::flag_if_overdue(&mut unit, as_of);
                if booked > Decimal::ZERO || flagged {
                    unit.updated_at = now;
                    tx.update_unit(unit)?;
                }
                Ok((booked, flagged))
            });

            match outcome {
                Ok((booked, flagged)) => {
                    if booked > Decimal::ZERO {
                        summary.units_accrued += 1;
                        summary.interest_booked += booked;
                    }
                    if flagged {
                        summary.units_flagged_past_due += 1;
                    }
                }
                Err(LedgerError::UnitNotActive(_)) => {
                    debug!(%unit_id, "unit settled before accrual reached it");
                }
                Err(err) => {
                    summary.failures += 1;
                    warn!(%unit_id, error = %err, "interest accrual failed for unit");
                }
            }
        }

        info!(
            %as_of,
            units_accrued = summary.units_accrued,
            interest_booked = %summary.interest_booked,
            units_flagged_past_due = summary.units_flagged_past_due,
            failures = summary.failures,
            "interest accrual pass complete"
        );
        Ok(summary)
    }

    /// Interest is only ever booked up to today; quotes project forward without persisting.
    fn validate_not_future(&self, field: &'static str, date: NaiveDate) -> Result<(), LedgerError> {
        let today = self.clock.today();
        if date > today {
            return Err(LedgerError::Validation(format!(
                "{field} {date} is after today ({today})"
            )));
        }
        Ok(())
    }

    fn commit<T, F>(&self, operation: &'static str, work: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut dyn LedgerWriter) -> Result<T, LedgerError>,
    {
        match self.store.transaction(work) {
            Err(LedgerError::PartialWriteDetected(detail)) => {
                error!(
                    operation,
                    detail = %detail,
                    "FATAL: ledger transaction was not applied atomically"
                );
                Err(LedgerError::PartialWriteDetected(detail))
            }
            other => other,
        }
    }
}

fn load_active_unit<R>(
    tx: &R,
    unit_id: UnitId,
) -> Result<(UnitFloorPlan, Account), LedgerError>
where
    R: LedgerReader + ?Sized,
{
    let unit = tx
        .unit(unit_id)?
        .ok_or(LedgerError::UnitNotFound(unit_id))?;
    if !unit.is_active() {
        return Err(LedgerError::UnitNotActive(unit_id));
    }
    let account = tx
        .account(unit.account_id)?
        .ok_or(LedgerError::AccountNotFound(unit.account_id))?;
    Ok((unit, account))
}

/// Book interest on `unit` from its accrued-through date up to `as_of`; returns the amount.
///
/// Compound accounts accrue on principal plus unpaid interest so repeated short passes compound
/// the same way one long pass would.
fn accrue_unit(unit: &mut UnitFloorPlan, account: &Account, as_of: NaiveDate) -> Decimal {
    if as_of <= unit.interest_accrued_through {
        return Decimal::ZERO;
    }

    let base = match account.interest_calculation {
        InterestCalculation::Simple => unit.current_balance,
        InterestCalculation::Compound => unit.current_balance + unit.unpaid_interest(),
    };
    let booked = finance::interest_for_period(
        base,
        account.interest_rate,
        unit.floor_date,
        unit.interest_accrued_through,
        as_of,
        account.interest_type,
        account.interest_calculation,
    );
    unit.total_interest_accrued += booked;
    unit.interest_accrued_through = as_of;
    booked
}

fn apply_payment(
    tx: &mut dyn LedgerWriter,
    unit: &mut UnitFloorPlan,
    account: &mut Account,
    request: PaymentRequest,
    now: DateTime<Utc>,
) -> Result<PaymentReceipt, LedgerError> {
    if request.payment_date < unit.floor_date {
        return Err(LedgerError::Validation(format!(
            "payment date {} precedes floor date {}",
            request.payment_date, unit.floor_date
        )));
    }

    match request.payment_type {
        PaymentType::Interest => {
            unit.total_interest_paid += request.amount;
        }
        PaymentType::Curtailment => {
            unit.current_balance = (unit.current_balance - request.amount).max(Decimal::ZERO);
            CurtailmentScheduler::for_account(account)
                .record_curtailment(unit)
                .ok_or_else(|| out_of_calendar("next curtailment date"))?;
        }
        PaymentType::Adjustment => {
            unit.current_balance = (unit.current_balance - request.amount).max(Decimal::ZERO);
        }
        PaymentType::Payoff => {
            let excess = request.amount - unit.current_balance;
            if excess > Decimal::ZERO {
                unit.total_interest_paid += excess.min(unit.unpaid_interest());
            }
            unit.current_balance = Decimal::ZERO;
            unit.status = UnitStatus::PaidOff;
            unit.payoff_date = Some(request.payment_date);
            unit.payoff_amount = Some(request.amount);
            unit.payoff_reference = request.reference.clone();
            unit.next_curtailment_date = None;
            unit.is_past_due = false;
            release_credit(account, unit.floor_amount, now);
            tx.update_account(account.clone())?;
        }
    }
    unit.updated_at = now;

    let payment = Payment {
        id: PaymentId::new(),
        unit_id: unit.id,
        payment_type: request.payment_type,
        amount: request.amount,
        payment_date: request.payment_date,
        reference: request.reference,
        balance_after: unit.current_balance,
        notes: request.notes,
        created_at: now,
    };

    tx.insert_payment(payment.clone())?;
    tx.update_unit(unit.clone())?;
    Ok(PaymentReceipt {
        payment,
        unit: unit.clone(),
    })
}

fn release_credit(account: &mut Account, amount: Decimal, now: DateTime<Utc>) {
    account.available_credit = (account.available_credit + amount).min(account.credit_limit);
    account.updated_at = now;
}

fn validate_name(name: &str) -> Result<(), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation("name is required".to_string()));
    }
    Ok(())
}

fn validate_positive(field: &'static str, value: Decimal) -> Result<(), LedgerError> {
    if value <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "{field} must be greater than zero"
        )));
    }
    validate_max_amount(field, value)
}

fn validate_non_negative(field: &'static str, value: Decimal) -> Result<(), LedgerError> {
    if value < Decimal::ZERO {
        return Err(LedgerError::Validation(format!("{field} must not be negative")));
    }
    validate_max_amount(field, value)
}

fn validate_max_amount(field: &'static str, value: Decimal) -> Result<(), LedgerError> {
    if value > MAX_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "{field} must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

fn validate_percent(field: &'static str, value: Decimal) -> Result<(), LedgerError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(LedgerError::Validation(format!(
            "{field} must be between 0 and 100"
        )));
    }
    Ok(())
}

fn validate_days(field: &'static str, value: i64) -> Result<(), LedgerError> {
    if !(0..=MAX_CURTAILMENT_DAYS).contains(&value) {
        return Err(LedgerError::Validation(format!(
            "{field} must be between 0 and {MAX_CURTAILMENT_DAYS}"
        )));
    }
    Ok(())
}

fn out_of_calendar(what: &str) -> LedgerError {
    LedgerError::Validation(format!("{what} falls outside the supported calendar"))
}

fn validate_account_terms(account: &Account) -> Result<(), LedgerError> {
    validate_percent("interest_rate", account.interest_rate)?;
    validate_percent("curtailment_percent", account.curtailment_percent)?;
    validate_percent("floor_fee_percent", account.floor_fee_percent)?;
    validate_non_negative("payoff_fee", account.payoff_fee)?;
    validate_days("curtailment_days", account.curtailment_days)?;
    validate_days(
        "subsequent_curtailment_days",
        account.subsequent_curtailment_days,
    )
}

/// Error raised by ledger operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("provider {0} not found")]
    ProviderNotFound(ProviderId),
    #[error("provider {0} is inactive")]
    ProviderInactive(ProviderId),
    #[error("account {0} not found")]
    AccountNotFound(AccountId),
    #[error("account {0} is not active")]
    AccountNotActive(AccountId),
    #[error("account cannot move from {} to {}", .from.label(), .to.label())]
    InvalidAccountTransition {
        from: AccountStatus,
        to: AccountStatus,
    },
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),
    #[error("unit {0} is not active")]
    UnitNotActive(UnitId),
    #[error("listing {0} already has an active floor plan")]
    ListingAlreadyFloored(ListingId),
    #[error("insufficient credit: requested {requested}, available {available}")]
    InsufficientCredit {
        requested: Decimal,
        available: Decimal,
    },
    #[error("record conflict")]
    Conflict,
    #[error("record not found")]
    RecordNotFound,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("partial write detected: {0}")]
    PartialWriteDetected(String),
}

impl LedgerError {
    /// Transient failures where retrying the whole operation is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict => Self::Conflict,
            StoreError::NotFound => Self::RecordNotFound,
            StoreError::Unavailable(detail) => Self::StoreUnavailable(detail),
            StoreError::PartialWrite(detail) => Self::PartialWriteDetected(detail),
        }
    }
}
