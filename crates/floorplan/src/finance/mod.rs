//! Pure floor plan arithmetic: interest, curtailments, aging, utilization, and payoff totals.
//!
//! Every monetary result is rounded to cents. Percentages are carried as `0–100` values and
//! divided by 100 at the point of use. Callers validate inputs; nothing here rejects negatives.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::ledger::domain::{InterestCalculation, InterestType};

const DAYS_PER_YEAR: i64 = 365;
const MONTHS_PER_YEAR: i64 = 12;

/// Units floored this long or less are considered healthy inventory.
pub const AGING_WARNING_AFTER_DAYS: i64 = 60;
/// Units floored longer than this are critical inventory.
pub const AGING_CRITICAL_AFTER_DAYS: i64 = 90;
/// Window (in days) in which an upcoming curtailment is surfaced.
pub const UPCOMING_CURTAILMENT_WINDOW_DAYS: i64 = 7;

/// Round a monetary value to cents.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percent(value: Decimal) -> Decimal {
    value / Decimal::ONE_HUNDRED
}

fn daily_rate(annual_rate_percent: Decimal) -> Decimal {
    percent(annual_rate_percent) / Decimal::from(DAYS_PER_YEAR)
}

fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    percent(annual_rate_percent) / Decimal::from(MONTHS_PER_YEAR)
}

/// One day of interest on `balance` at an annual percentage rate.
pub fn daily_interest(balance: Decimal, annual_rate_percent: Decimal) -> Decimal {
    round_cents(balance * daily_rate(annual_rate_percent))
}

/// Interest accrued over `days` with daily periods.
///
/// Simple mode is linear in `days`; compound mode compounds daily and is never below the simple
/// figure for a positive day count.
pub fn accrued_interest(
    balance: Decimal,
    annual_rate_percent: Decimal,
    days: i64,
    mode: InterestCalculation,
) -> Decimal {
    periodic_interest(balance, daily_rate(annual_rate_percent), days, mode)
}

/// Interest for `periods` at `rate` per period, under either calculation mode.
fn periodic_interest(
    balance: Decimal,
    rate: Decimal,
    periods: i64,
    mode: InterestCalculation,
) -> Decimal {
    if periods <= 0 {
        return Decimal::ZERO;
    }

    let simple = balance * rate * Decimal::from(periods);
    match mode {
        InterestCalculation::Simple => round_cents(simple),
        InterestCalculation::Compound => (Decimal::ONE + rate)
            .checked_powi(periods)
            .and_then(|growth| balance.checked_mul(growth - Decimal::ONE))
            .map_or_else(|| round_cents(simple), round_cents),
    }
}

/// Interest booked from `from` through `through` for an account's interest type.
///
/// `Daily` accrues one period per calendar day at `rate/365`. `Monthly` accrues one period per
/// whole month completed since `anchor` (the floor date) at `rate/12`, so a partial month books
/// nothing until its anniversary passes.
pub fn interest_for_period(
    balance: Decimal,
    annual_rate_percent: Decimal,
    anchor: NaiveDate,
    from: NaiveDate,
    through: NaiveDate,
    interest_type: InterestType,
    mode: InterestCalculation,
) -> Decimal {
    match interest_type {
        InterestType::Daily => {
            accrued_interest(balance, annual_rate_percent, days_between(from, through), mode)
        }
        InterestType::Monthly => periodic_interest(
            balance,
            monthly_rate(annual_rate_percent),
            whole_months_between(anchor, through) - whole_months_between(anchor, from),
            mode,
        ),
    }
}

/// Scheduled principal reduction for one curtailment.
pub fn curtailment_amount(floor_amount: Decimal, curtailment_percent: Decimal) -> Decimal {
    round_cents(floor_amount * percent(curtailment_percent))
}

/// Signed day difference `to − from`, using calendar dates only.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Number of complete calendar months from `from` to `to` (0 when `to` precedes `from`).
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    if to <= from {
        return 0;
    }
    let mut months = i64::from(to.year() - from.year()) * 12 + i64::from(to.month())
        - i64::from(from.month());
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0)
}

/// Days a unit has been floored as of `today`.
pub fn days_floored(floor_date: NaiveDate, today: NaiveDate) -> i64 {
    days_between(floor_date, today)
}

/// Days from `today` until `target`; negative once the target has passed.
pub fn days_until(target: NaiveDate, today: NaiveDate) -> i64 {
    days_between(today, target)
}

/// Due date of the next curtailment, always measured from the floor date.
///
/// `None` when the date falls outside the calendar range `NaiveDate` can represent.
pub fn next_curtailment_date(
    floor_date: NaiveDate,
    first_offset_days: i64,
    curtailments_paid: u32,
    subsequent_offset_days: i64,
) -> Option<NaiveDate> {
    let offset = if curtailments_paid == 0 {
        first_offset_days
    } else {
        subsequent_offset_days
            .checked_mul(i64::from(curtailments_paid))?
            .checked_add(first_offset_days)?
    };
    floor_date.checked_add_signed(Duration::try_days(offset)?)
}

/// Inventory risk band derived from how long a unit has been floored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingStatus {
    Healthy,
    Warning,
    Critical,
}

impl AgingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

pub fn aging_status(days_floored: i64) -> AgingStatus {
    if days_floored <= AGING_WARNING_AFTER_DAYS {
        AgingStatus::Healthy
    } else if days_floored <= AGING_CRITICAL_AFTER_DAYS {
        AgingStatus::Warning
    } else {
        AgingStatus::Critical
    }
}

/// Where a unit stands relative to its next curtailment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurtailmentStatus {
    PastDue,
    Due,
    Upcoming,
    Ok,
}

/// The explicit past-due flag wins over the date comparison.
pub fn curtailment_status(
    next_date: NaiveDate,
    is_past_due: bool,
    today: NaiveDate,
) -> CurtailmentStatus {
    let remaining = days_until(next_date, today);
    if is_past_due || remaining < 0 {
        CurtailmentStatus::PastDue
    } else if remaining == 0 {
        CurtailmentStatus::Due
    } else if remaining <= UPCOMING_CURTAILMENT_WINDOW_DAYS {
        CurtailmentStatus::Upcoming
    } else {
        CurtailmentStatus::Ok
    }
}

/// Percentage of a credit line currently drawn; 0 for a non-positive limit.
pub fn credit_utilization(limit: Decimal, available: Decimal) -> Decimal {
    if limit <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_cents((limit - available) / limit * Decimal::ONE_HUNDRED)
}

pub fn payoff_amount(balance: Decimal, unpaid_interest: Decimal, payoff_fee: Decimal) -> Decimal {
    round_cents(balance + unpaid_interest + payoff_fee)
}

/// Balance and annual rate of one unit, as consumed by [`monthly_interest_estimate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatedBalance {
    pub balance: Decimal,
    pub annual_rate_percent: Decimal,
}

/// Forward-looking monthly interest across units. Not an accrual record.
pub fn monthly_interest_estimate<I>(units: I) -> Decimal
where
    I: IntoIterator<Item = RatedBalance>,
{
    let total: Decimal = units
        .into_iter()
        .map(|unit| unit.balance * monthly_rate(unit.annual_rate_percent))
        .sum();
    round_cents(total)
}
