use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::domain::Alert;

/// Outbound hook for critical alerts (e-mail, SMS, or a dealer-portal push adapter).
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Notifier that only writes the alert to the log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl AlertNotifier for LogNotifier {
    fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        info!(
            alert_id = %alert.id,
            dealer_id = %alert.dealer_id,
            alert_type = alert.alert_type.label(),
            title = %alert.title,
            "critical floor plan alert"
        );
        Ok(())
    }
}

/// Non-blocking hand-off to an [`AlertNotifier`].
///
/// Alerts are queued on an unbounded channel and delivered by a background task, so a slow or
/// failing transport never stalls the alert job. Delivery failures are logged by the drain task.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::UnboundedSender<Alert>,
}

impl NotificationDispatcher {
    /// Start the drain task on the current tokio runtime.
    pub fn spawn<N>(notifier: Arc<N>) -> Self
    where
        N: AlertNotifier + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Alert>();
        tokio::spawn(async move {
            while let Some(alert) = receiver.recv().await {
                if let Err(err) = notifier.notify(&alert) {
                    warn!(alert_id = %alert.id, error = %err, "alert notification failed");
                }
            }
            debug!("alert notification channel closed");
        });
        Self { sender }
    }

    pub fn dispatch(&self, alert: Alert) {
        let alert_id = alert.id;
        if self.sender.send(alert).is_err() {
            warn!(%alert_id, "alert notification dropped; dispatcher is shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::domain::{AlertDraft, AlertScope, AlertSeverity, AlertType};
    use crate::ledger::domain::{DealerId, UnitId};
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recording {
        delivered: Mutex<Vec<Alert>>,
        fail: bool,
    }

    impl AlertNotifier for Recording {
        fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Transport("smtp down".to_string()));
            }
            self.delivered.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    fn alert() -> Alert {
        AlertDraft {
            dealer_id: DealerId("dealer-1".to_string()),
            scope: AlertScope::Unit(UnitId::new()),
            alert_type: AlertType::CurtailmentPastDue,
            severity: AlertSeverity::Critical,
            title: "Curtailment past due".to_string(),
            message: "overdue".to_string(),
            due_date: None,
            amount: None,
        }
        .into_alert(Utc::now())
    }

    async fn drain() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn dispatched_alerts_reach_the_notifier() {
        let notifier = Arc::new(Recording::default());
        let dispatcher = NotificationDispatcher::spawn(Arc::clone(&notifier));

        let sent = alert();
        dispatcher.dispatch(sent.clone());
        drain().await;

        assert_eq!(*notifier.delivered.lock().unwrap(), vec![sent]);
    }

    #[tokio::test]
    async fn transport_failures_do_not_stop_the_drain_task() {
        let notifier = Arc::new(Recording {
            fail: true,
            ..Recording::default()
        });
        let dispatcher = NotificationDispatcher::spawn(Arc::clone(&notifier));

        dispatcher.dispatch(alert());
        dispatcher.dispatch(alert());
        drain().await;

        assert!(!dispatcher.sender.is_closed());
    }
}
