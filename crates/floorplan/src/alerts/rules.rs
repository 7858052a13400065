//! Alert conditions derived from ledger state. Each rule looks only at the current snapshot.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::domain::{AlertDraft, AlertScope, AlertSeverity, AlertType};
use crate::finance;
use crate::ledger::domain::{AccountWithProvider, FlooredUnit};

pub const HIGH_INTEREST_THRESHOLD: Decimal = dec!(500);
pub const AGING_INFO_DAYS: i64 = 90;
pub const AGING_WARNING_DAYS: i64 = 120;
pub const AGING_CRITICAL_DAYS: i64 = 150;
pub const UTILIZATION_WARNING_PERCENT: Decimal = dec!(80);
pub const UTILIZATION_CRITICAL_PERCENT: Decimal = dec!(90);

/// Every alert condition currently true for one active unit.
pub fn evaluate_unit(floored: &FlooredUnit, today: NaiveDate) -> Vec<AlertDraft> {
    let FlooredUnit {
        unit,
        account,
        provider_name,
    } = floored;
    let scope = AlertScope::Unit(unit.id);
    let curtailment = account.curtailment_amount(unit.floor_amount);
    let draft = |alert_type, severity, title: String, message: String| AlertDraft {
        dealer_id: unit.dealer_id.clone(),
        scope,
        alert_type,
        severity,
        title,
        message,
        due_date: None,
        amount: None,
    };
    let mut drafts = Vec::new();

    if unit.is_past_due {
        let mut alert = draft(
            AlertType::CurtailmentPastDue,
            AlertSeverity::Critical,
            "Curtailment past due".to_string(),
            format!(
                "Curtailment of {} for listing {} with {} is past due.",
                money(curtailment),
                unit.listing_id,
                provider_name
            ),
        );
        alert.due_date = unit.next_curtailment_date;
        alert.amount = Some(curtailment);
        drafts.push(alert);
    } else if let Some(next) = unit.next_curtailment_date {
        let remaining = finance::days_until(next, today);
        let graded = match remaining {
            0 => Some((
                AlertType::CurtailmentDue,
                AlertSeverity::Critical,
                "Curtailment due today".to_string(),
            )),
            1..=3 => Some((
                AlertType::CurtailmentUpcoming,
                AlertSeverity::Warning,
                format!("Curtailment due in {remaining} days"),
            )),
            4..=7 => Some((
                AlertType::CurtailmentUpcoming,
                AlertSeverity::Info,
                format!("Curtailment due in {remaining} days"),
            )),
            _ => None,
        };
        if let Some((alert_type, severity, title)) = graded {
            let mut alert = draft(
                alert_type,
                severity,
                title,
                format!(
                    "Curtailment of {} for listing {} with {} is due {}.",
                    money(curtailment),
                    unit.listing_id,
                    provider_name,
                    next
                ),
            );
            alert.due_date = Some(next);
            alert.amount = Some(curtailment);
            drafts.push(alert);
        }
    }

    let unpaid_interest = unit.unpaid_interest();
    if unpaid_interest > HIGH_INTEREST_THRESHOLD {
        let mut alert = draft(
            AlertType::HighInterest,
            AlertSeverity::Warning,
            "High unpaid interest".to_string(),
            format!(
                "Listing {} has {} of unpaid floor plan interest.",
                unit.listing_id,
                money(unpaid_interest)
            ),
        );
        alert.amount = Some(unpaid_interest);
        drafts.push(alert);
    }

    let days_floored = unit.days_floored(today);
    let aging = if days_floored >= AGING_CRITICAL_DAYS {
        Some(AlertSeverity::Critical)
    } else if days_floored >= AGING_WARNING_DAYS {
        Some(AlertSeverity::Warning)
    } else if days_floored >= AGING_INFO_DAYS {
        Some(AlertSeverity::Info)
    } else {
        None
    };
    if let Some(severity) = aging {
        drafts.push(draft(
            AlertType::AgingInventory,
            severity,
            format!("Unit floored {days_floored} days"),
            format!(
                "Listing {} has been floored since {} ({} days).",
                unit.listing_id, unit.floor_date, days_floored
            ),
        ));
    }

    drafts
}

/// Credit-line pressure alert for one active account, if any.
pub fn evaluate_account(entry: &AccountWithProvider) -> Option<AlertDraft> {
    let account = &entry.account;
    let utilization = account.utilization();
    let severity = if utilization >= UTILIZATION_CRITICAL_PERCENT {
        AlertSeverity::Critical
    } else if utilization >= UTILIZATION_WARNING_PERCENT {
        AlertSeverity::Warning
    } else {
        return None;
    };

    Some(AlertDraft {
        dealer_id: account.dealer_id.clone(),
        scope: AlertScope::Account(account.id),
        alert_type: AlertType::CreditLimitWarning,
        severity,
        title: format!("Credit line {}% utilized", utilization.round()),
        message: format!(
            "{} line has {} available of {}.",
            entry.provider_name,
            money(account.available_credit),
            money(account.credit_limit)
        ),
        due_date: None,
        amount: Some(account.available_credit),
    })
}

fn money(value: Decimal) -> String {
    format!("${:.2}", finance::round_cents(value))
}
