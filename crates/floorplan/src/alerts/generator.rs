use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{AlertDraft, AlertSeverity};
use super::notifier::NotificationDispatcher;
use super::rules;
use super::store::AlertStore;
use crate::clock::Clock;
use crate::ledger::domain::AccountStatus;
use crate::ledger::service::{AccrualSummary, FloorPlanLedger, LedgerError};
use crate::ledger::store::{LedgerStore, StoreError};

/// Alerts older than this are purged even when still open.
pub const ALERT_RETENTION_DAYS: i64 = 7;

/// Result of one alert generation pass, as returned to the external trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRunSummary {
    pub alerts_generated: usize,
    pub alerts_purged: usize,
    pub units_evaluated: usize,
    pub accounts_evaluated: usize,
    pub failures: usize,
    pub timestamp: DateTime<Utc>,
}

/// Scheduled cycle: optional interest accrual followed by alert generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    #[serde(flatten)]
    pub alerts: AlertRunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_accrual: Option<AccrualSummary>,
}

/// Scans active units and accounts and reconciles the alert table with what it finds.
///
/// The generator only reads ledger state. Each `(scope, alert type)` pair is reconciled by
/// deleting its open alert before inserting the fresh one, so repeated runs converge on one
/// open alert per condition.
pub struct AlertGenerator<S, C, A> {
    ledger: FloorPlanLedger<S, C>,
    alerts: Arc<A>,
    dispatcher: Option<NotificationDispatcher>,
}

impl<S, C, A> Clone for AlertGenerator<S, C, A> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            alerts: Arc::clone(&self.alerts),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<S, C, A> AlertGenerator<S, C, A>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    pub fn new(ledger: FloorPlanLedger<S, C>, alerts: Arc<A>) -> Self {
        Self {
            ledger,
            alerts,
            dispatcher: None,
        }
    }

    /// Forward newly generated critical alerts to `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn run(&self) -> Result<AlertRunSummary, AlertJobError> {
        let today = self.ledger.today();
        let now = self.ledger.now();
        let mut summary = AlertRunSummary {
            alerts_generated: 0,
            alerts_purged: 0,
            units_evaluated: 0,
            accounts_evaluated: 0,
            failures: 0,
            timestamp: now,
        };

        for floored in self.ledger.floored_units(None)? {
            summary.units_evaluated += 1;
            let drafts = rules::evaluate_unit(&floored, today);
            match self.reconcile(drafts, now) {
                Ok(inserted) => summary.alerts_generated += inserted,
                Err(err) => {
                    summary.failures += 1;
                    warn!(unit_id = %floored.unit.id, error = %err, "unit alert evaluation failed");
                }
            }
        }

        for entry in self.ledger.accounts(None, Some(AccountStatus::Active))? {
            summary.accounts_evaluated += 1;
            let drafts: Vec<AlertDraft> = rules::evaluate_account(&entry).into_iter().collect();
            match self.reconcile(drafts, now) {
                Ok(inserted) => summary.alerts_generated += inserted,
                Err(err) => {
                    summary.failures += 1;
                    warn!(
                        account_id = %entry.account.id,
                        error = %err,
                        "account alert evaluation failed"
                    );
                }
            }
        }

        summary.alerts_purged = self
            .alerts
            .purge_alerts(now - Duration::days(ALERT_RETENTION_DAYS))?;

        info!(
            alerts_generated = summary.alerts_generated,
            alerts_purged = summary.alerts_purged,
            units_evaluated = summary.units_evaluated,
            accounts_evaluated = summary.accounts_evaluated,
            failures = summary.failures,
            "alert generation complete"
        );
        Ok(summary)
    }

    /// Accrue interest through today (when enabled), then generate alerts from the fresh state.
    pub fn run_cycle(&self, accrue_interest: bool) -> Result<CycleSummary, AlertJobError> {
        let interest_accrual = if accrue_interest {
            Some(self.ledger.accrue_all(self.ledger.today())?)
        } else {
            None
        };
        let alerts = self.run()?;
        Ok(CycleSummary {
            alerts,
            interest_accrual,
        })
    }

    /// Replace each draft's open alert. A critical alert is dispatched only when the condition it
    /// replaces was not already critical, so a standing condition notifies once.
    fn reconcile(&self, drafts: Vec<AlertDraft>, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for draft in drafts {
            let replaced = self
                .alerts
                .delete_open_alerts(&draft.scope, draft.alert_type)?;
            let alert = draft.into_alert(now);
            self.alerts.insert_alert(alert.clone())?;
            inserted += 1;

            let escalated = replaced
                .iter()
                .all(|previous| previous.severity < alert.severity);
            if alert.severity == AlertSeverity::Critical && escalated {
                if let Some(dispatcher) = &self.dispatcher {
                    dispatcher.dispatch(alert);
                }
            }
        }
        Ok(inserted)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlertJobError {
    #[error("ledger read failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("alert store failed: {0}")]
    Store(#[from] StoreError),
}
