use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::domain::{AccountId, DealerId, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub Uuid);

impl AlertId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    CurtailmentPastDue,
    CurtailmentDue,
    CurtailmentUpcoming,
    HighInterest,
    AgingInventory,
    CreditLimitWarning,
}

impl AlertType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CurtailmentPastDue => "curtailment_past_due",
            Self::CurtailmentDue => "curtailment_due",
            Self::CurtailmentUpcoming => "curtailment_upcoming",
            Self::HighInterest => "high_interest",
            Self::AgingInventory => "aging_inventory",
            Self::CreditLimitWarning => "credit_limit_warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Entity an alert is about. Reconciliation keys on `(scope, alert_type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AlertScope {
    Unit(UnitId),
    Account(AccountId),
}

/// Persisted, dealer-facing notification row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub dealer_id: DealerId,
    pub scope: AlertScope,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub due_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub action_taken: bool,
    pub created_at: DateTime<Utc>,
}

/// Alert derived from ledger state, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDraft {
    pub dealer_id: DealerId,
    pub scope: AlertScope,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub due_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
}

impl AlertDraft {
    pub fn into_alert(self, created_at: DateTime<Utc>) -> Alert {
        Alert {
            id: AlertId::new(),
            dealer_id: self.dealer_id,
            scope: self.scope,
            alert_type: self.alert_type,
            severity: self.severity,
            title: self.title,
            message: self.message,
            due_date: self.due_date,
            amount: self.amount,
            is_read: false,
            is_dismissed: false,
            action_taken: false,
            created_at,
        }
    }
}

/// Counts of open (non-dismissed) alerts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub warning: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn tally<'a, I>(alerts: I) -> Self
    where
        I: IntoIterator<Item = &'a Alert>,
    {
        alerts
            .into_iter()
            .filter(|alert| !alert.is_dismissed)
            .fold(Self::default(), |mut counts, alert| {
                match alert.severity {
                    AlertSeverity::Info => counts.info += 1,
                    AlertSeverity::Warning => counts.warning += 1,
                    AlertSeverity::Critical => counts.critical += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.critical
    }
}
