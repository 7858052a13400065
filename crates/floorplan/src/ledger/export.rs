use std::io;

use super::domain::Payment;
use crate::finance;

const HEADER: [&str; 8] = [
    "payment_id",
    "unit_id",
    "payment_type",
    "payment_date",
    "amount",
    "balance_after",
    "reference",
    "notes",
];

/// Write a unit's payment history as CSV, one row per ledger entry in recorded order.
pub fn write_payments_csv<W: io::Write>(writer: W, payments: &[Payment]) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;
    for payment in payments {
        csv.write_record([
            payment.id.to_string(),
            payment.unit_id.to_string(),
            payment.payment_type.label().to_string(),
            payment.payment_date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", finance::round_cents(payment.amount)),
            format!("{:.2}", finance::round_cents(payment.balance_after)),
            payment.reference.clone().unwrap_or_default(),
            payment.notes.clone().unwrap_or_default(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}
