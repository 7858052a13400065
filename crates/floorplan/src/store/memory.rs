use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::alerts::domain::{Alert, AlertId, AlertScope, AlertType};
use crate::alerts::store::AlertStore;
use crate::ledger::domain::{
    Account, AccountId, AccountStatus, AccountWithProvider, DealerId, FlooredUnit, ListingId,
    Payment, Provider, ProviderId, UnitFilter, UnitFloorPlan, UnitId, UnitStatus,
};
use crate::ledger::store::{LedgerReader, LedgerStore, LedgerWriter, StoreError};

#[derive(Debug, Clone, Default)]
struct LedgerTables {
    providers: BTreeMap<ProviderId, Provider>,
    accounts: BTreeMap<AccountId, Account>,
    units: BTreeMap<UnitId, UnitFloorPlan>,
    payments: Vec<Payment>,
}

/// Process-local store with the same transactional contract as the relational backend.
///
/// A transaction holds the ledger lock for its whole duration (serializable) and works on a
/// copy of the tables that only replaces the committed state when the work succeeds.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    ledger: Mutex<LedgerTables>,
    alerts: Mutex<BTreeMap<AlertId, Alert>>,
    fail_next_commit: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next ledger transaction fail at commit time, discarding its writes.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// A panic inside a transaction only ever touched the working copy, so the committed tables
    /// behind a poisoned lock are still consistent and safe to keep serving.
    fn ledger_tables(&self) -> MutexGuard<'_, LedgerTables> {
        self.ledger.lock().unwrap_or_else(|poisoned| {
            warn!("recovering ledger tables after a panicked transaction");
            PoisonError::into_inner(poisoned)
        })
    }

    fn alert_table(&self) -> MutexGuard<'_, BTreeMap<AlertId, Alert>> {
        self.alerts.lock().unwrap_or_else(|poisoned| {
            warn!("recovering alert table after a panicked writer");
            PoisonError::into_inner(poisoned)
        })
    }
}

impl LedgerStore for InMemoryStore {
    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn LedgerReader) -> Result<T, E>,
        E: From<StoreError>,
    {
        let guard = self.ledger_tables();
        work(&*guard)
    }

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn LedgerWriter) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.ledger_tables();
        let mut working = guard.clone();
        let value = work(&mut working)?;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit failed".to_string()).into());
        }

        *guard = working;
        Ok(value)
    }
}

impl LedgerTables {
    fn provider_name(&self, provider_id: ProviderId) -> String {
        self.providers
            .get(&provider_id)
            .map(|provider| provider.name.clone())
            .unwrap_or_default()
    }
}

impl LedgerReader for LedgerTables {
    fn provider(&self, id: ProviderId) -> Result<Option<Provider>, StoreError> {
        Ok(self.providers.get(&id).cloned())
    }

    fn providers(&self) -> Result<Vec<Provider>, StoreError> {
        let mut providers: Vec<Provider> = self.providers.values().cloned().collect();
        providers.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(providers)
    }

    fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).cloned())
    }

    fn accounts(
        &self,
        dealer_id: Option<&DealerId>,
        status: Option<AccountStatus>,
    ) -> Result<Vec<AccountWithProvider>, StoreError> {
        let mut accounts: Vec<AccountWithProvider> = self
            .accounts
            .values()
            .filter(|account| dealer_id.map_or(true, |dealer| &account.dealer_id == dealer))
            .filter(|account| status.map_or(true, |status| account.status == status))
            .map(|account| AccountWithProvider {
                account: account.clone(),
                provider_name: self.provider_name(account.provider_id),
            })
            .collect();
        accounts.sort_by_key(|entry| (entry.account.open_date, entry.account.created_at));
        Ok(accounts)
    }

    fn unit(&self, id: UnitId) -> Result<Option<UnitFloorPlan>, StoreError> {
        Ok(self.units.get(&id).cloned())
    }

    fn active_unit_for_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Option<UnitFloorPlan>, StoreError> {
        Ok(self
            .units
            .values()
            .find(|unit| unit.status == UnitStatus::Active && &unit.listing_id == listing_id)
            .cloned())
    }

    fn units(&self, filter: &UnitFilter) -> Result<Vec<UnitFloorPlan>, StoreError> {
        let mut units: Vec<UnitFloorPlan> = self
            .units
            .values()
            .filter(|unit| filter.matches(unit))
            .cloned()
            .collect();
        units.sort_by_key(|unit| (unit.floor_date, unit.created_at));
        Ok(units)
    }

    fn floored_units(&self, dealer_id: Option<&DealerId>) -> Result<Vec<FlooredUnit>, StoreError> {
        let filter = UnitFilter {
            status: Some(UnitStatus::Active),
            dealer_id: dealer_id.cloned(),
            ..UnitFilter::default()
        };
        let floored = self
            .units(&filter)?
            .into_iter()
            .filter_map(|unit| {
                let account = self.accounts.get(&unit.account_id)?.clone();
                let provider_name = self.provider_name(account.provider_id);
                Some(FlooredUnit {
                    unit,
                    account,
                    provider_name,
                })
            })
            .collect();
        Ok(floored)
    }

    fn payments(&self, unit_id: UnitId) -> Result<Vec<Payment>, StoreError> {
        Ok(self
            .payments
            .iter()
            .filter(|payment| payment.unit_id == unit_id)
            .cloned()
            .collect())
    }
}

impl LedgerWriter for LedgerTables {
    fn insert_provider(&mut self, provider: Provider) -> Result<(), StoreError> {
        if self.providers.contains_key(&provider.id) {
            return Err(StoreError::Conflict);
        }
        self.providers.insert(provider.id, provider);
        Ok(())
    }

    fn update_provider(&mut self, provider: Provider) -> Result<(), StoreError> {
        match self.providers.get_mut(&provider.id) {
            Some(existing) => {
                *existing = provider;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn insert_account(&mut self, account: Account) -> Result<(), StoreError> {
        if self.accounts.contains_key(&account.id) {
            return Err(StoreError::Conflict);
        }
        if !self.providers.contains_key(&account.provider_id) {
            return Err(StoreError::NotFound);
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    fn update_account(&mut self, account: Account) -> Result<(), StoreError> {
        match self.accounts.get_mut(&account.id) {
            Some(existing) => {
                *existing = account;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn insert_unit(&mut self, unit: UnitFloorPlan) -> Result<(), StoreError> {
        if self.units.contains_key(&unit.id) {
            return Err(StoreError::Conflict);
        }
        if !self.accounts.contains_key(&unit.account_id) {
            return Err(StoreError::NotFound);
        }
        self.units.insert(unit.id, unit);
        Ok(())
    }

    fn update_unit(&mut self, unit: UnitFloorPlan) -> Result<(), StoreError> {
        match self.units.get_mut(&unit.id) {
            Some(existing) => {
                *existing = unit;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn insert_payment(&mut self, payment: Payment) -> Result<(), StoreError> {
        if !self.units.contains_key(&payment.unit_id) {
            return Err(StoreError::NotFound);
        }
        if self.payments.iter().any(|existing| existing.id == payment.id) {
            return Err(StoreError::Conflict);
        }
        self.payments.push(payment);
        Ok(())
    }
}

impl AlertStore for InMemoryStore {
    fn insert_alert(&self, alert: Alert) -> Result<(), StoreError> {
        let mut alerts = self.alert_table();
        if alerts.contains_key(&alert.id) {
            return Err(StoreError::Conflict);
        }
        alerts.insert(alert.id, alert);
        Ok(())
    }

    fn delete_open_alerts(
        &self,
        scope: &AlertScope,
        alert_type: AlertType,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut alerts = self.alert_table();
        let matching: Vec<AlertId> = alerts
            .values()
            .filter(|alert| {
                !alert.is_dismissed && &alert.scope == scope && alert.alert_type == alert_type
            })
            .map(|alert| alert.id)
            .collect();
        Ok(matching
            .into_iter()
            .filter_map(|id| alerts.remove(&id))
            .collect())
    }

    fn purge_alerts(&self, created_before: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut alerts = self.alert_table();
        let before = alerts.len();
        alerts.retain(|_, alert| !alert.is_dismissed && alert.created_at >= created_before);
        Ok(before - alerts.len())
    }

    fn alert(&self, id: AlertId) -> Result<Option<Alert>, StoreError> {
        Ok(self.alert_table().get(&id).cloned())
    }

    fn alerts(
        &self,
        dealer_id: &DealerId,
        include_dismissed: bool,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut alerts: Vec<Alert> = self
            .alert_table()
            .values()
            .filter(|alert| &alert.dealer_id == dealer_id)
            .filter(|alert| include_dismissed || !alert.is_dismissed)
            .cloned()
            .collect();
        alerts.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(right.severity.cmp(&left.severity))
        });
        Ok(alerts)
    }

    fn update_alert(&self, alert: Alert) -> Result<(), StoreError> {
        let mut alerts = self.alert_table();
        match alerts.get_mut(&alert.id) {
            Some(existing) => {
                *existing = alert;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use rust_decimal_macros::dec;

    fn provider(name: &str) -> Provider {
        Provider {
            id: ProviderId::new(),
            name: name.to_string(),
            default_interest_rate: dec!(8),
            default_curtailment_days: 30,
            default_curtailment_percent: dec!(10),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn a_panicking_transaction_leaves_committed_tables_serving() {
        let store = InMemoryStore::new();
        store
            .transaction(|tx| tx.insert_provider(provider("Northpoint Commercial")))
            .expect("committed");

        let crashed = panic::catch_unwind(AssertUnwindSafe(|| {
            store.transaction(|tx| -> Result<(), StoreError> {
                tx.insert_provider(provider("Half Written"))?;
                panic!("writer crashed mid-transaction");
            })
        }));
        assert!(crashed.is_err());

        let names: Vec<String> = store
            .read(|reader| reader.providers())
            .expect("read after panic")
            .into_iter()
            .map(|provider| provider.name)
            .collect();
        assert_eq!(names, vec!["Northpoint Commercial".to_string()]);

        store
            .transaction(|tx| tx.insert_provider(provider("Ally Floorplan")))
            .expect("writes resume");
        assert_eq!(store.read(|reader| reader.providers()).expect("read").len(), 2);
    }
}
