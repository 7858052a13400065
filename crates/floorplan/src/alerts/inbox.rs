use std::sync::Arc;

use super::domain::{Alert, AlertId, SeverityCounts};
use super::store::AlertStore;
use crate::ledger::domain::DealerId;
use crate::ledger::store::StoreError;

/// Dealer-facing view over the alert table: listing and flag updates.
pub struct AlertInbox<A> {
    store: Arc<A>,
}

impl<A> Clone for AlertInbox<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<A> AlertInbox<A>
where
    A: AlertStore + 'static,
{
    pub fn new(store: Arc<A>) -> Self {
        Self { store }
    }

    pub fn list(
        &self,
        dealer_id: &DealerId,
        include_dismissed: bool,
    ) -> Result<Vec<Alert>, InboxError> {
        Ok(self.store.alerts(dealer_id, include_dismissed)?)
    }

    pub fn severity_counts(&self, dealer_id: &DealerId) -> Result<SeverityCounts, InboxError> {
        let alerts = self.store.alerts(dealer_id, false)?;
        Ok(SeverityCounts::tally(&alerts))
    }

    pub fn mark_read(&self, alert_id: AlertId) -> Result<Alert, InboxError> {
        self.update(alert_id, |alert| alert.is_read = true)
    }

    /// Dismissed alerts stay hidden until the next purge removes them.
    pub fn dismiss(&self, alert_id: AlertId) -> Result<Alert, InboxError> {
        self.update(alert_id, |alert| {
            alert.is_read = true;
            alert.is_dismissed = true;
        })
    }

    pub fn mark_action_taken(&self, alert_id: AlertId) -> Result<Alert, InboxError> {
        self.update(alert_id, |alert| {
            alert.is_read = true;
            alert.action_taken = true;
        })
    }

    fn update<F>(&self, alert_id: AlertId, change: F) -> Result<Alert, InboxError>
    where
        F: FnOnce(&mut Alert),
    {
        let mut alert = self
            .store
            .alert(alert_id)?
            .ok_or(InboxError::AlertNotFound(alert_id))?;
        change(&mut alert);
        match self.store.update_alert(alert.clone()) {
            Ok(()) => Ok(alert),
            // Purged between the read and the write.
            Err(StoreError::NotFound) => Err(InboxError::AlertNotFound(alert_id)),
            Err(other) => Err(other.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InboxError {
    #[error("alert {0} not found")]
    AlertNotFound(AlertId),
    #[error("alert store failed: {0}")]
    Store(#[from] StoreError),
}
