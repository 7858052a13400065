use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::Duration;
use rust_decimal_macros::dec;

use super::common::*;
use crate::alerts::domain::{AlertDraft, AlertScope, AlertSeverity, AlertType};
use crate::alerts::store::AlertStore;
use crate::alerts::{AlertGenerator, NotificationDispatcher};
use crate::clock::{Clock, FixedClock};
use crate::ledger::domain::AccountId;
use crate::store::InMemoryStore;

#[test]
fn run_reflects_current_ledger_state() {
    let (harness, fresh, stale) = seeded();

    let summary = harness.generator.run().expect("run");

    assert_eq!(summary.units_evaluated, 2);
    assert_eq!(summary.accounts_evaluated, 1);
    assert_eq!(summary.alerts_generated, 3);
    assert_eq!(summary.failures, 0);

    let mut expected = vec![
        (
            AlertScope::Unit(fresh.id),
            AlertType::CurtailmentUpcoming,
            AlertSeverity::Warning,
        ),
        (
            AlertScope::Unit(stale.id),
            AlertType::AgingInventory,
            AlertSeverity::Critical,
        ),
        (
            AlertScope::Account(fresh.account_id),
            AlertType::CreditLimitWarning,
            AlertSeverity::Warning,
        ),
    ];
    expected.sort();
    assert_eq!(open_alert_keys(&harness.store), expected);
}

#[test]
fn rerunning_without_ledger_changes_is_idempotent() {
    let (harness, _, _) = seeded();

    harness.generator.run().expect("first run");
    let first = open_alert_keys(&harness.store);
    let second_summary = harness.generator.run().expect("second run");
    let second = open_alert_keys(&harness.store);

    assert_eq!(first, second);
    assert_eq!(second_summary.alerts_generated, 3);
    assert_eq!(
        harness.store.alerts(&dealer(), true).expect("alerts").len(),
        3
    );
}

#[test]
fn cycle_accrues_interest_and_flags_overdue_units_before_evaluating() {
    let (harness, _, stale) = seeded();

    let summary = harness.generator.run_cycle(true).expect("cycle");

    let accrual = summary.interest_accrual.expect("accrual ran");
    assert_eq!(accrual.units_flagged_past_due, 1);
    let keys = open_alert_keys(&harness.store);
    assert!(keys.contains(&(
        AlertScope::Unit(stale.id),
        AlertType::CurtailmentPastDue,
        AlertSeverity::Critical
    )));
    assert!(keys.contains(&(
        AlertScope::Unit(stale.id),
        AlertType::HighInterest,
        AlertSeverity::Warning
    )));

    let unit = harness.ledger.get_unit(stale.id).expect("unit");
    assert!(unit.is_past_due);
    assert_eq!(unit.current_balance, stale.current_balance);
}

#[test]
fn run_without_accrual_never_mutates_the_ledger() {
    let (harness, fresh, stale) = seeded();

    harness.generator.run_cycle(false).expect("cycle");

    assert_eq!(harness.ledger.get_unit(fresh.id).expect("unit"), fresh);
    assert_eq!(harness.ledger.get_unit(stale.id).expect("unit"), stale);
}

#[test]
fn dismissed_alerts_are_purged_and_condition_is_raised_again() {
    let (harness, _, stale) = seeded();
    harness.generator.run().expect("run");
    let aging = harness
        .inbox
        .list(&dealer(), false)
        .expect("list")
        .into_iter()
        .find(|alert| alert.scope == AlertScope::Unit(stale.id))
        .expect("aging alert");
    harness.inbox.dismiss(aging.id).expect("dismiss");

    let summary = harness.generator.run().expect("rerun");

    assert_eq!(summary.alerts_purged, 1);
    assert!(harness.store.alert(aging.id).expect("lookup").is_none());
    let replacement = harness
        .inbox
        .list(&dealer(), true)
        .expect("list")
        .into_iter()
        .filter(|alert| alert.scope == AlertScope::Unit(stale.id))
        .collect::<Vec<_>>();
    assert_eq!(replacement.len(), 1);
    assert!(!replacement[0].is_dismissed);
}

#[test]
fn alerts_older_than_retention_are_purged() {
    let harness = harness();
    let now = FixedClock::new(today()).now();
    let draft = || AlertDraft {
        dealer_id: dealer(),
        scope: AlertScope::Account(AccountId::new()),
        alert_type: AlertType::CreditLimitWarning,
        severity: AlertSeverity::Warning,
        title: "Credit line 85% utilized".to_string(),
        message: "Northpoint Commercial line has $15000.00 available.".to_string(),
        due_date: None,
        amount: None,
    };
    let old = draft().into_alert(now - Duration::days(8));
    let recent = draft().into_alert(now - Duration::days(6));
    harness.store.insert_alert(old.clone()).expect("insert");
    harness.store.insert_alert(recent.clone()).expect("insert");

    let summary = harness.generator.run().expect("run");

    assert_eq!(summary.alerts_purged, 1);
    assert!(harness.store.alert(old.id).expect("lookup").is_none());
    assert!(harness.store.alert(recent.id).expect("lookup").is_some());
}

#[test]
fn failing_scope_is_counted_and_the_run_continues() {
    let (harness, fresh, stale) = seeded();
    let alerts = Arc::new(FlakyAlerts {
        inner: InMemoryStore::new(),
        failing_scope: Mutex::new(Some(AlertScope::Unit(fresh.id))),
    });
    let generator = AlertGenerator::new(harness.ledger.clone(), Arc::clone(&alerts));

    let summary = generator.run().expect("run");

    assert_eq!(summary.failures, 1);
    assert_eq!(summary.alerts_generated, 2);
    let scopes: Vec<AlertScope> = alerts
        .alerts(&dealer(), false)
        .expect("alerts")
        .into_iter()
        .map(|alert| alert.scope)
        .collect();
    assert!(scopes.contains(&AlertScope::Unit(stale.id)));
    assert!(!scopes.contains(&AlertScope::Unit(fresh.id)));
}

#[tokio::test]
async fn only_critical_alerts_are_dispatched() {
    let (harness, _, stale) = seeded();
    let notifier = Arc::new(RecordingNotifier::default());
    let generator = harness
        .generator
        .clone()
        .with_dispatcher(NotificationDispatcher::spawn(Arc::clone(&notifier)));

    generator.run().expect("run");
    tokio::time::sleep(StdDuration::from_millis(20)).await;

    let delivered = notifier.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].scope, AlertScope::Unit(stale.id));
    assert_eq!(delivered[0].alert_type, AlertType::AgingInventory);
}

#[tokio::test]
async fn standing_critical_conditions_notify_once_and_escalations_notify_again() {
    let (harness, _, stale) = seeded();
    let notifier = Arc::new(RecordingNotifier::default());
    let generator = harness
        .generator
        .clone()
        .with_dispatcher(NotificationDispatcher::spawn(Arc::clone(&notifier)));

    generator.run().expect("first run");
    generator.run().expect("second run");
    tokio::time::sleep(StdDuration::from_millis(20)).await;
    {
        let delivered = notifier.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].scope, AlertScope::Unit(stale.id));
    }

    let account = harness
        .ledger
        .accounts(Some(&dealer()), None)
        .expect("accounts")
        .remove(0)
        .account;
    floor(&harness.ledger, &account, "lst-extra", dec!(6000), date(2025, 4, 28));
    generator.run().expect("escalated run");
    generator.run().expect("steady run");
    tokio::time::sleep(StdDuration::from_millis(20)).await;

    let delivered = notifier.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[1].scope, AlertScope::Account(account.id));
    assert_eq!(delivered[1].alert_type, AlertType::CreditLimitWarning);
}
