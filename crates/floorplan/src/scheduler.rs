//! Curtailment due-date bookkeeping for floored units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::finance;
use crate::ledger::domain::{Account, UnitFloorPlan};

/// Cadence of an account's curtailments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurtailmentScheduler {
    pub first_curtailment_days: i64,
    pub subsequent_curtailment_days: i64,
}

impl CurtailmentScheduler {
    pub fn for_account(account: &Account) -> Self {
        Self {
            first_curtailment_days: account.curtailment_days,
            subsequent_curtailment_days: account.subsequent_curtailment_days,
        }
    }

    /// `None` when the due date would fall outside the representable calendar.
    pub fn due_date(&self, floor_date: NaiveDate, curtailments_paid: u32) -> Option<NaiveDate> {
        finance::next_curtailment_date(
            floor_date,
            self.first_curtailment_days,
            curtailments_paid,
            self.subsequent_curtailment_days,
        )
    }

    pub fn first_due_date(&self, floor_date: NaiveDate) -> Option<NaiveDate> {
        self.due_date(floor_date, 0)
    }

    /// Advance a unit past one curtailment payment.
    ///
    /// Any curtailment-type payment counts, partial or not: the paid counter increments, the next
    /// due date is recomputed from the floor date, and the past-due flag clears. Leaves the unit
    /// untouched and returns `None` when the next due date cannot be represented.
    pub fn record_curtailment(&self, unit: &mut UnitFloorPlan) -> Option<NaiveDate> {
        let paid = unit.curtailments_paid.checked_add(1)?;
        let next = self.due_date(unit.floor_date, paid)?;
        unit.curtailments_paid = paid;
        unit.next_curtailment_date = Some(next);
        unit.is_past_due = false;
        Some(next)
    }

    /// Raise the past-due flag once the due date has passed. Never clears it.
    pub fn flag_if_overdue(unit: &mut UnitFloorPlan, today: NaiveDate) -> bool {
        match unit.next_curtailment_date {
            Some(next) if !unit.is_past_due && finance::days_until(next, today) < 0 => {
                unit.is_past_due = true;
                true
            }
            _ => false,
        }
    }
}
