use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use super::generator::AlertGenerator;
use super::store::AlertStore;
use crate::clock::Clock;
use crate::ledger::store::LedgerStore;

/// Cadence of the background accrual and alert cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertSchedule {
    pub interval: Duration,
    pub accrue_interest: bool,
}

/// Run the cycle on a fixed interval until the returned handle is aborted.
///
/// The store is synchronous, so each cycle runs on the blocking pool. A tick that arrives while
/// a cycle is still running is skipped rather than queued.
pub fn spawn_alert_schedule<S, C, A>(
    generator: AlertGenerator<S, C, A>,
    schedule: AlertSchedule,
) -> JoinHandle<()>
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
    A: AlertStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = time::interval(schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_secs = schedule.interval.as_secs(),
            accrue_interest = schedule.accrue_interest,
            "alert schedule started"
        );

        loop {
            ticker.tick().await;
            let cycle = generator.clone();
            let outcome =
                tokio::task::spawn_blocking(move || cycle.run_cycle(schedule.accrue_interest))
                    .await;
            match outcome {
                Ok(Ok(summary)) => info!(
                    alerts_generated = summary.alerts.alerts_generated,
                    failures = summary.alerts.failures,
                    "scheduled alert cycle finished"
                ),
                Ok(Err(err)) => warn!(error = %err, "scheduled alert cycle failed"),
                Err(err) => error!(error = %err, "scheduled alert cycle panicked"),
            }
        }
    })
}
