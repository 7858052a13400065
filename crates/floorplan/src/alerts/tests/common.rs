use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::Response;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::alerts::domain::{Alert, AlertId, AlertScope, AlertSeverity, AlertType};
use crate::alerts::notifier::{AlertNotifier, NotifyError};
use crate::alerts::store::AlertStore;
use crate::alerts::{AlertGenerator, AlertInbox};
use crate::clock::FixedClock;
use crate::ledger::domain::{
    Account, DealerId, ListingId, NewAccount, NewProvider, NewUnit, UnitFloorPlan,
};
use crate::ledger::service::FloorPlanLedger;
use crate::ledger::store::StoreError;
use crate::store::InMemoryStore;

pub(super) type Ledger = FloorPlanLedger<InMemoryStore, FixedClock>;

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn today() -> NaiveDate {
    date(2025, 5, 1)
}

pub(super) fn dealer() -> DealerId {
    DealerId("dealer-alerts".to_string())
}

pub(super) struct Harness {
    pub store: Arc<InMemoryStore>,
    pub ledger: Ledger,
    pub generator: AlertGenerator<InMemoryStore, FixedClock, InMemoryStore>,
    pub inbox: AlertInbox<InMemoryStore>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let ledger = FloorPlanLedger::new(Arc::clone(&store), Arc::new(FixedClock::new(today())));
    let generator = AlertGenerator::new(ledger.clone(), Arc::clone(&store));
    let inbox = AlertInbox::new(Arc::clone(&store));
    Harness {
        store,
        ledger,
        generator,
        inbox,
    }
}

pub(super) fn open_account(ledger: &Ledger, credit_limit: Decimal) -> Account {
    let provider = ledger
        .create_provider(NewProvider {
            name: "Northpoint Commercial".to_string(),
            default_interest_rate: dec!(8),
            default_curtailment_days: 30,
            default_curtailment_percent: dec!(10),
            is_active: true,
        })
        .expect("provider");
    ledger
        .open_account(NewAccount {
            dealer_id: dealer(),
            provider_id: provider.id,
            credit_limit,
            open_date: date(2024, 1, 1),
            interest_rate: None,
            interest_type: Default::default(),
            interest_calculation: Default::default(),
            curtailment_days: None,
            curtailment_percent: None,
            subsequent_curtailment_days: None,
            floor_fee_percent: None,
            payoff_fee: None,
        })
        .expect("account")
}

pub(super) fn floor(
    ledger: &Ledger,
    account: &Account,
    listing: &str,
    amount: Decimal,
    floor_date: NaiveDate,
) -> UnitFloorPlan {
    ledger
        .open_unit(NewUnit {
            listing_id: ListingId(listing.to_string()),
            account_id: account.id,
            floor_amount: amount,
            floor_date,
            reference: None,
        })
        .expect("unit floored")
}

/// One unit two days from its first curtailment, one unit 151 days old, and an account at 85%
/// utilization.
pub(super) fn seeded() -> (Harness, UnitFloorPlan, UnitFloorPlan) {
    let harness = harness();
    let account = open_account(&harness.ledger, dec!(100000));
    let fresh = floor(&harness.ledger, &account, "lst-fresh", dec!(30000), date(2025, 4, 3));
    let stale = floor(&harness.ledger, &account, "lst-stale", dec!(55000), date(2024, 12, 1));
    (harness, fresh, stale)
}

pub(super) fn open_alert_keys(
    store: &InMemoryStore,
) -> Vec<(AlertScope, AlertType, AlertSeverity)> {
    let mut keys: Vec<_> = store
        .alerts(&dealer(), false)
        .expect("alerts")
        .into_iter()
        .map(|alert| (alert.scope, alert.alert_type, alert.severity))
        .collect();
    keys.sort();
    keys
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    pub delivered: Mutex<Vec<Alert>>,
}

impl AlertNotifier for RecordingNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.delivered.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Alert store that refuses inserts for one scope.
pub(super) struct FlakyAlerts {
    pub inner: InMemoryStore,
    pub failing_scope: Mutex<Option<AlertScope>>,
}

impl AlertStore for FlakyAlerts {
    fn insert_alert(&self, alert: Alert) -> Result<(), StoreError> {
        if *self.failing_scope.lock().unwrap() == Some(alert.scope) {
            return Err(StoreError::Unavailable("alert table locked".to_string()));
        }
        self.inner.insert_alert(alert)
    }

    fn delete_open_alerts(
        &self,
        scope: &AlertScope,
        alert_type: AlertType,
    ) -> Result<Vec<Alert>, StoreError> {
        self.inner.delete_open_alerts(scope, alert_type)
    }

    fn purge_alerts(&self, created_before: DateTime<Utc>) -> Result<usize, StoreError> {
        self.inner.purge_alerts(created_before)
    }

    fn alert(&self, id: AlertId) -> Result<Option<Alert>, StoreError> {
        self.inner.alert(id)
    }

    fn alerts(
        &self,
        dealer_id: &DealerId,
        include_dismissed: bool,
    ) -> Result<Vec<Alert>, StoreError> {
        self.inner.alerts(dealer_id, include_dismissed)
    }

    fn update_alert(&self, alert: Alert) -> Result<(), StoreError> {
        self.inner.update_alert(alert)
    }
}

pub(super) async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
