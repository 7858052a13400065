use std::time::Duration;

use super::common::*;
use crate::alerts::domain::{AlertScope, AlertType};
use crate::alerts::{spawn_alert_schedule, AlertSchedule};

#[tokio::test]
async fn schedule_runs_the_cycle_until_aborted() {
    let (harness, _, stale) = seeded();
    let handle = spawn_alert_schedule(
        harness.generator.clone(),
        AlertSchedule {
            interval: Duration::from_millis(25),
            accrue_interest: true,
        },
    );

    let mut raised = false;
    for _ in 0..80 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        raised = open_alert_keys(&harness.store)
            .iter()
            .any(|(scope, kind, _)| {
                *scope == AlertScope::Unit(stale.id) && *kind == AlertType::CurtailmentPastDue
            });
        if raised {
            break;
        }
    }
    handle.abort();
    assert!(handle.await.expect_err("aborted").is_cancelled());

    assert!(raised, "scheduled cycle never raised the past-due alert");
    assert!(harness.ledger.get_unit(stale.id).expect("unit").is_past_due);
}
