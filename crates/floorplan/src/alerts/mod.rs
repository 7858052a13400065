//! Derived floor plan alerts: rule evaluation, reconciliation against the alert table, the
//! recurring schedule, and the dealer inbox.

pub mod domain;
pub mod generator;
pub mod inbox;
pub mod notifier;
pub mod router;
pub mod rules;
pub mod schedule;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{Alert, AlertDraft, AlertId, AlertScope, AlertSeverity, AlertType, SeverityCounts};
pub use generator::{AlertGenerator, AlertJobError, AlertRunSummary, CycleSummary};
pub use inbox::{AlertInbox, InboxError};
pub use notifier::{AlertNotifier, LogNotifier, NotificationDispatcher, NotifyError};
pub use router::{alert_router, AlertRoutes, TriggerSettings};
pub use schedule::{spawn_alert_schedule, AlertSchedule};
pub use store::AlertStore;
