use std::thread;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::common::*;
use crate::ledger::domain::{PaymentRequest, PaymentType};

const WORKERS: usize = 8;
const PAYMENTS_PER_WORKER: usize = 4;

#[test]
fn concurrent_payments_on_one_unit_never_lose_an_update() {
    let fx = fixture();
    let account = fx.account(dec!(100000));
    let unit = fx
        .floor(&account, "vin-1001", dec!(50000), date(2025, 1, 1))
        .expect("unit");

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let ledger = fx.ledger.clone();
            scope.spawn(move || {
                let payment_type = if worker % 2 == 0 {
                    PaymentType::Curtailment
                } else {
                    PaymentType::Adjustment
                };
                for sequence in 0..PAYMENTS_PER_WORKER {
                    ledger
                        .record_payment(
                            unit.id,
                            PaymentRequest {
                                payment_type,
                                amount: dec!(250),
                                payment_date: date(2025, 2, 1),
                                reference: Some(format!("W{worker}-{sequence}")),
                                notes: None,
                            },
                        )
                        .expect("payment recorded");
                }
            });
        }
    });

    let payments = fx.ledger.payments(unit.id).expect("payments");
    assert_eq!(payments.len(), WORKERS * PAYMENTS_PER_WORKER);

    let mut replayed = unit.floor_amount;
    for payment in &payments {
        replayed = (replayed - payment.amount).max(Decimal::ZERO);
        assert_eq!(payment.balance_after, replayed);
    }

    let settled = fx.ledger.get_unit(unit.id).expect("unit");
    assert_eq!(settled.current_balance, replayed);
    assert_eq!(settled.current_balance, dec!(42000));
    assert_eq!(
        settled.curtailments_paid as usize,
        WORKERS / 2 * PAYMENTS_PER_WORKER
    );
}
