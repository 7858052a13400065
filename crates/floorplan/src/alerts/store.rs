use chrono::{DateTime, Utc};

use super::domain::{Alert, AlertId, AlertScope, AlertType};
use crate::ledger::domain::DealerId;
use crate::ledger::store::StoreError;

/// Persistence for derived alerts. Only the alert generator inserts or deletes rows.
pub trait AlertStore: Send + Sync {
    fn insert_alert(&self, alert: Alert) -> Result<(), StoreError>;

    /// Delete every non-dismissed alert of `alert_type` for `scope`; returns the removed rows.
    fn delete_open_alerts(
        &self,
        scope: &AlertScope,
        alert_type: AlertType,
    ) -> Result<Vec<Alert>, StoreError>;

    /// Delete alerts that are dismissed or were created before `created_before`.
    fn purge_alerts(&self, created_before: DateTime<Utc>) -> Result<usize, StoreError>;

    fn alert(&self, id: AlertId) -> Result<Option<Alert>, StoreError>;

    /// Alerts for one dealer, newest first.
    fn alerts(
        &self,
        dealer_id: &DealerId,
        include_dismissed: bool,
    ) -> Result<Vec<Alert>, StoreError>;

    fn update_alert(&self, alert: Alert) -> Result<(), StoreError>;
}
