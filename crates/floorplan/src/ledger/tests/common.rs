use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::clock::FixedClock;
use crate::ledger::domain::{
    Account, DealerId, ListingId, NewAccount, NewProvider, NewUnit, PaymentRequest, PaymentType,
    Provider, UnitFloorPlan, UnitId,
};
use crate::ledger::service::{FloorPlanLedger, LedgerError, PaymentReceipt};
use crate::store::InMemoryStore;

pub(super) type Ledger = FloorPlanLedger<InMemoryStore, FixedClock>;

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn dealer() -> DealerId {
    DealerId("dealer-1".to_string())
}

pub(super) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub ledger: Ledger,
}

pub(super) fn fixture() -> Fixture {
    fixture_at(date(2025, 3, 1))
}

pub(super) fn fixture_at(today: NaiveDate) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::new(today));
    let ledger = FloorPlanLedger::new(Arc::clone(&store), clock);
    Fixture { store, ledger }
}

pub(super) fn account_request(provider: &Provider, credit_limit: Decimal) -> NewAccount {
    NewAccount {
        dealer_id: dealer(),
        provider_id: provider.id,
        credit_limit,
        open_date: date(2024, 12, 1),
        interest_rate: None,
        interest_type: Default::default(),
        interest_calculation: Default::default(),
        curtailment_days: None,
        curtailment_percent: None,
        subsequent_curtailment_days: None,
        floor_fee_percent: None,
        payoff_fee: None,
    }
}

impl Fixture {
    /// 8% interest, first curtailment after 30 days at 10% of the floor amount.
    pub fn provider(&self) -> Provider {
        self.ledger
            .create_provider(NewProvider {
                name: "Northpoint Commercial".to_string(),
                default_interest_rate: dec!(8),
                default_curtailment_days: 30,
                default_curtailment_percent: dec!(10),
                is_active: true,
            })
            .expect("provider created")
    }

    pub fn account(&self, credit_limit: Decimal) -> Account {
        self.account_with(credit_limit, |_| {})
    }

    pub fn account_with<F>(&self, credit_limit: Decimal, customize: F) -> Account
    where
        F: FnOnce(&mut NewAccount),
    {
        let provider = self.provider();
        let mut request = account_request(&provider, credit_limit);
        customize(&mut request);
        self.ledger.open_account(request).expect("account opened")
    }

    pub fn floor(
        &self,
        account: &Account,
        listing: &str,
        amount: Decimal,
        floor_date: NaiveDate,
    ) -> Result<UnitFloorPlan, LedgerError> {
        self.ledger.open_unit(NewUnit {
            listing_id: ListingId(listing.to_string()),
            account_id: account.id,
            floor_amount: amount,
            floor_date,
            reference: Some(format!("FLOOR-{listing}")),
        })
    }

    pub fn pay(
        &self,
        unit_id: UnitId,
        payment_type: PaymentType,
        amount: Decimal,
        payment_date: NaiveDate,
    ) -> Result<PaymentReceipt, LedgerError> {
        self.ledger.record_payment(
            unit_id,
            PaymentRequest {
                payment_type,
                amount,
                payment_date,
                reference: None,
                notes: None,
            },
        )
    }

    pub fn available_credit(&self, account: &Account) -> Decimal {
        self.ledger
            .account(account.id)
            .expect("account")
            .account
            .available_credit
    }
}

pub(super) async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
