use crate::infra::FloorPlanEngine;
use chrono::{Duration, NaiveDate};
use clap::Args;
use floorplan::alerts::Alert;
use floorplan::clock::{Clock, FixedClock, SystemClock};
use floorplan::dashboard::DashboardSummary;
use floorplan::error::AppError;
use floorplan::finance;
use floorplan::ledger::{
    Account, DealerId, InterestCalculation, InterestType, ListingId, NewAccount, NewProvider,
    NewUnit, Payment, PaymentRequest, PaymentType, UnitFilter, UnitFloorPlan,
};
use floorplan::ledger::write_payments_csv;
use floorplan::scheduler::CurtailmentScheduler;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_DEALER: &str = "demo-dealer";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reporting date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Write every demo payment to this CSV file.
    #[arg(long)]
    pub(crate) payments_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct AlertRunArgs {
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Evaluate alerts without accruing interest first.
    #[arg(long)]
    pub(crate) skip_accrual: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScheduleArgs {
    /// Amount financed
    #[arg(long)]
    pub(crate) floor_amount: Decimal,
    /// Floor date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) floor_date: Option<NaiveDate>,
    /// Annual interest rate in percent
    #[arg(long, default_value = "8")]
    pub(crate) rate: Decimal,
    /// Days from flooring to the first curtailment
    #[arg(long, default_value_t = 30)]
    pub(crate) curtailment_days: i64,
    /// Share of the floor amount due at each curtailment, in percent
    #[arg(long, default_value = "10")]
    pub(crate) curtailment_percent: Decimal,
    /// Days between later curtailments
    #[arg(long, default_value_t = 30)]
    pub(crate) subsequent_days: i64,
    /// Number of curtailments to project
    #[arg(long, default_value_t = 6)]
    pub(crate) periods: u32,
}

/// One projected curtailment with the simple daily interest earned since the previous one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScheduleRow {
    pub(crate) number: u32,
    pub(crate) due_date: NaiveDate,
    pub(crate) interest: Decimal,
    pub(crate) curtailment: Decimal,
    pub(crate) balance_after: Decimal,
}

pub(crate) fn project_schedule(args: &ScheduleArgs, floor_date: NaiveDate) -> Vec<ScheduleRow> {
    let scheduler = CurtailmentScheduler {
        first_curtailment_days: args.curtailment_days,
        subsequent_curtailment_days: args.subsequent_days,
    };
    let scheduled = finance::curtailment_amount(args.floor_amount, args.curtailment_percent);
    let mut balance = args.floor_amount;
    let mut accrued_through = floor_date;
    let mut rows = Vec::with_capacity(args.periods as usize);

    for paid in 0..args.periods {
        if balance <= Decimal::ZERO {
            break;
        }
        let Some(due_date) = scheduler.due_date(floor_date, paid) else {
            break;
        };
        let interest = finance::interest_for_period(
            balance,
            args.rate,
            floor_date,
            accrued_through,
            due_date,
            InterestType::Daily,
            InterestCalculation::Simple,
        );
        let curtailment = scheduled.min(balance);
        balance -= curtailment;
        accrued_through = due_date;
        rows.push(ScheduleRow {
            number: paid + 1,
            due_date,
            interest,
            curtailment,
            balance_after: balance,
        });
    }
    rows
}

pub(crate) fn run_schedule(args: ScheduleArgs) -> Result<(), AppError> {
    if args.floor_amount <= Decimal::ZERO {
        return Err(floorplan::ledger::LedgerError::Validation(
            "floor amount must be greater than zero".to_string(),
        )
        .into());
    }
    let floor_date = args.floor_date.unwrap_or_else(|| SystemClock.today());
    let rows = project_schedule(&args, floor_date);

    println!(
        "Curtailment schedule for {} floored {} at {}%",
        money(args.floor_amount),
        floor_date,
        args.rate
    );
    println!(
        "  daily interest on the full balance: {}",
        money(finance::daily_interest(args.floor_amount, args.rate))
    );
    println!("  #  due date     interest      curtailment   balance after");
    for row in &rows {
        println!(
            "  {:<2} {}   {:>12}  {:>12}  {:>14}",
            row.number,
            row.due_date,
            money(row.interest),
            money(row.curtailment),
            money(row.balance_after)
        );
    }
    let interest: Decimal = rows.iter().map(|row| row.interest).sum();
    println!("  interest over the schedule: {}", money(interest));
    Ok(())
}

/// Run one accrual and alert cycle over the seeded demo book and list what it raised.
pub(crate) fn run_alert_cycle(args: AlertRunArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| SystemClock.today());
    let engine = FloorPlanEngine::in_memory(Arc::new(FixedClock::new(today)));
    seed_demo(&engine, today)?;

    let cycle = engine.generator.run_cycle(!args.skip_accrual)?;
    println!("Alert cycle as of {today}");
    match &cycle.interest_accrual {
        Some(accrual) => println!(
            "  accrued {} across {} units",
            money(accrual.interest_booked),
            accrual.units_accrued
        ),
        None => println!("  interest accrual skipped"),
    }
    println!(
        "  generated {}, purged {}, failures {}",
        cycle.alerts.alerts_generated, cycle.alerts.alerts_purged, cycle.alerts.failures
    );
    render_alerts(&engine.inbox.list(&DealerId(DEMO_DEALER.to_string()), false)?);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        payments_csv,
    } = args;
    let today = today.unwrap_or_else(|| SystemClock.today());

    println!("Floor plan financing demo as of {today}");
    let engine = FloorPlanEngine::in_memory(Arc::new(FixedClock::new(today)));
    let units = seed_demo(&engine, today)?;

    let cycle = engine.generator.run_cycle(true)?;
    if let Some(accrual) = &cycle.interest_accrual {
        println!(
            "\nInterest accrual: {} units, {} booked, {} newly past due",
            accrual.units_accrued,
            money(accrual.interest_booked),
            accrual.units_flagged_past_due
        );
    }
    println!(
        "Alert cycle: {} alerts generated across {} units and {} accounts",
        cycle.alerts.alerts_generated, cycle.alerts.units_evaluated, cycle.alerts.accounts_evaluated
    );

    let dealer = DealerId(DEMO_DEALER.to_string());
    render_dashboard(&engine.dashboard.summary(&dealer)?);
    render_alerts(&engine.inbox.list(&dealer, false)?);

    let first = &units[0];
    let quote = engine.ledger.payoff_quote(first.id, today, None)?;
    println!(
        "\nPayoff quote for {}: principal {} + interest {} + fee {} = {}",
        first.listing_id,
        money(quote.principal_balance),
        money(quote.unpaid_interest),
        money(quote.payoff_fee),
        money(quote.total)
    );

    let sold = &units[units.len() - 1];
    let receipt = engine
        .ledger
        .payoff(sold.id, today, None, Some("DEMO-SALE".to_string()))?;
    println!(
        "Paid off {} for {}",
        receipt.unit.listing_id,
        money(receipt.payment.amount)
    );
    let summary = engine.dashboard.summary(&dealer)?;
    println!(
        "Utilization after payoff: {}% ({} available of {})",
        summary.credit_utilization,
        money(summary.total_available_credit),
        money(summary.total_credit_limit)
    );

    if let Some(path) = payments_csv {
        let mut payments: Vec<Payment> = Vec::new();
        for unit in engine.ledger.list_units(&UnitFilter::default())? {
            payments.extend(engine.ledger.payments(unit.id)?);
        }
        write_payments_csv(File::create(&path)?, &payments)?;
        println!("\nWrote {} payments to {}", payments.len(), path.display());
    }

    Ok(())
}

/// Seed one dealer line with units at different points in their curtailment lifecycle.
pub(crate) fn seed_demo(
    engine: &FloorPlanEngine<FixedClock>,
    today: NaiveDate,
) -> Result<Vec<UnitFloorPlan>, AppError> {
    let ledger = &engine.ledger;
    let provider = ledger.create_provider(NewProvider {
        name: "Northpoint Commercial".to_string(),
        default_interest_rate: dec!(8),
        default_curtailment_days: 30,
        default_curtailment_percent: dec!(10),
        is_active: true,
    })?;
    let account: Account = ledger.open_account(NewAccount {
        dealer_id: DealerId(DEMO_DEALER.to_string()),
        provider_id: provider.id,
        credit_limit: dec!(200000),
        open_date: today - Duration::days(365),
        interest_rate: None,
        interest_type: InterestType::Daily,
        interest_calculation: InterestCalculation::Simple,
        curtailment_days: None,
        curtailment_percent: None,
        subsequent_curtailment_days: None,
        floor_fee_percent: None,
        payoff_fee: Some(dec!(75)),
    })?;

    let inventory = [
        ("VIN-1HGCM82633A004352", dec!(42000), 28),
        ("VIN-2T1BURHE0JC074215", dec!(38500), 45),
        ("VIN-5YJSA1E26HF176325", dec!(61000), 132),
        ("VIN-3FA6P0H72HR123456", dec!(27500), 10),
    ];
    let mut units = Vec::with_capacity(inventory.len());
    for (listing, amount, days_ago) in inventory {
        units.push(ledger.open_unit(NewUnit {
            listing_id: ListingId(listing.to_string()),
            account_id: account.id,
            floor_amount: amount,
            floor_date: today - Duration::days(days_ago),
            reference: Some(format!("FP-{}", &listing[listing.len() - 6..])),
        })?);
    }

    let curtailed = &units[1];
    if let Some(due) = curtailed.next_curtailment_date {
        ledger.record_payment(
            curtailed.id,
            PaymentRequest {
                payment_type: PaymentType::Curtailment,
                amount: account.curtailment_amount(curtailed.floor_amount),
                payment_date: due,
                reference: Some("ACH-30114".to_string()),
                notes: Some("first curtailment".to_string()),
            },
        )?;
    }

    Ok(units)
}

fn render_dashboard(summary: &DashboardSummary) {
    println!("\nDashboard for {}", summary.dealer_id);
    println!(
        "  credit: {} drawn of {} ({}% utilized)",
        money(summary.total_credit_limit - summary.total_available_credit),
        money(summary.total_credit_limit),
        summary.credit_utilization
    );
    println!(
        "  units floored: {} (past due {}, curtailments due soon {})",
        summary.units_floored, summary.units_past_due, summary.upcoming_curtailments
    );
    println!(
        "  aging: {} healthy / {} warning / {} critical",
        summary.aging.healthy, summary.aging.warning, summary.aging.critical
    );
    println!(
        "  balance {} | unpaid interest {} | est. monthly interest {}",
        money(summary.total_current_balance),
        money(summary.unpaid_interest),
        money(summary.monthly_interest_estimate)
    );
    for rollup in &summary.accounts {
        println!(
            "  - {}: {} units, {} outstanding, {}% utilized",
            rollup.provider_name,
            rollup.units_floored,
            money(rollup.current_balance),
            rollup.utilization
        );
    }
}

fn render_alerts(alerts: &[Alert]) {
    println!("\nOpen alerts ({})", alerts.len());
    for alert in alerts {
        println!(
            "  [{}] {}: {}",
            alert.severity.label(),
            alert.title,
            alert.message
        );
    }
}

fn money(value: Decimal) -> String {
    format!("${:.2}", finance::round_cents(value))
}
