use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::finance::{self, AgingStatus, CurtailmentStatus};

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of a lending institution.
    ProviderId
);
uuid_identifier!(
    /// Identifier of a dealer credit line.
    AccountId
);
uuid_identifier!(
    /// Identifier of one financed inventory unit.
    UnitId
);
uuid_identifier!(PaymentId);

/// Tenant key. Every account, unit, and alert belongs to exactly one dealer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealerId(pub String);

impl fmt::Display for DealerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marketplace listing a unit floor plan finances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestType {
    #[default]
    Daily,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestCalculation {
    #[default]
    Simple,
    Compound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    Closed,
}

impl AccountStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Closed => "closed",
        }
    }

    /// `active ⇄ suspended`, and either may close. `closed` is terminal.
    pub const fn can_transition_to(self, next: AccountStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Suspended)
                | (Self::Suspended, Self::Active)
                | (Self::Active, Self::Closed)
                | (Self::Suspended, Self::Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Active,
    PaidOff,
    Transferred,
}

impl UnitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PaidOff => "paid_off",
            Self::Transferred => "transferred",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Curtailment,
    Interest,
    Payoff,
    Adjustment,
}

impl PaymentType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Curtailment => "curtailment",
            Self::Interest => "interest",
            Self::Payoff => "payoff",
            Self::Adjustment => "adjustment",
        }
    }
}

/// Lending institution offering floor plan lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub default_interest_rate: Decimal,
    pub default_curtailment_days: i64,
    pub default_curtailment_percent: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One dealer's credit line with one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub dealer_id: DealerId,
    pub provider_id: ProviderId,
    pub credit_limit: Decimal,
    pub available_credit: Decimal,
    pub interest_rate: Decimal,
    pub interest_type: InterestType,
    pub interest_calculation: InterestCalculation,
    pub curtailment_days: i64,
    pub curtailment_percent: Decimal,
    pub subsequent_curtailment_days: i64,
    pub floor_fee_percent: Decimal,
    pub payoff_fee: Decimal,
    pub status: AccountStatus,
    pub open_date: NaiveDate,
    pub close_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn utilization(&self) -> Decimal {
        finance::credit_utilization(self.credit_limit, self.available_credit)
    }

    /// Credit currently drawn against the line.
    pub fn drawn_credit(&self) -> Decimal {
        self.credit_limit - self.available_credit
    }

    /// Scheduled curtailment for a unit floored against this account.
    pub fn curtailment_amount(&self, floor_amount: Decimal) -> Decimal {
        finance::curtailment_amount(floor_amount, self.curtailment_percent)
    }
}

/// One financed inventory unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFloorPlan {
    pub id: UnitId,
    pub dealer_id: DealerId,
    pub account_id: AccountId,
    pub listing_id: ListingId,
    pub floor_amount: Decimal,
    pub floor_date: NaiveDate,
    pub floor_reference: Option<String>,
    pub current_balance: Decimal,
    pub total_interest_accrued: Decimal,
    pub total_interest_paid: Decimal,
    pub interest_accrued_through: NaiveDate,
    pub first_curtailment_date: Option<NaiveDate>,
    pub next_curtailment_date: Option<NaiveDate>,
    pub curtailments_paid: u32,
    pub is_past_due: bool,
    pub payoff_date: Option<NaiveDate>,
    pub payoff_amount: Option<Decimal>,
    pub payoff_reference: Option<String>,
    pub transfer_date: Option<NaiveDate>,
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnitFloorPlan {
    pub fn is_active(&self) -> bool {
        self.status == UnitStatus::Active
    }

    pub fn unpaid_interest(&self) -> Decimal {
        (self.total_interest_accrued - self.total_interest_paid).max(Decimal::ZERO)
    }

    pub fn days_floored(&self, today: NaiveDate) -> i64 {
        finance::days_floored(self.floor_date, today)
    }

    pub fn aging_status(&self, today: NaiveDate) -> AgingStatus {
        finance::aging_status(self.days_floored(today))
    }

    pub fn curtailment_status(&self, today: NaiveDate) -> Option<CurtailmentStatus> {
        self.next_curtailment_date
            .map(|next| finance::curtailment_status(next, self.is_past_due, today))
    }
}

/// Immutable ledger entry for one financial event against a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub unit_id: UnitId,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub balance_after: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProvider {
    pub name: String,
    pub default_interest_rate: Decimal,
    pub default_curtailment_days: i64,
    pub default_curtailment_percent: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial provider edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default_interest_rate: Option<Decimal>,
    #[serde(default)]
    pub default_curtailment_days: Option<i64>,
    #[serde(default)]
    pub default_curtailment_percent: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Input for opening a credit line. Absent terms fall back to the provider defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub dealer_id: DealerId,
    pub provider_id: ProviderId,
    pub credit_limit: Decimal,
    pub open_date: NaiveDate,
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    #[serde(default)]
    pub interest_type: InterestType,
    #[serde(default)]
    pub interest_calculation: InterestCalculation,
    #[serde(default)]
    pub curtailment_days: Option<i64>,
    #[serde(default)]
    pub curtailment_percent: Option<Decimal>,
    #[serde(default)]
    pub subsequent_curtailment_days: Option<i64>,
    #[serde(default)]
    pub floor_fee_percent: Option<Decimal>,
    #[serde(default)]
    pub payoff_fee: Option<Decimal>,
}

/// Input for flooring a listing against an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUnit {
    pub listing_id: ListingId,
    pub account_id: AccountId,
    pub floor_amount: Decimal,
    pub floor_date: NaiveDate,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Input for recording a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Read-only payoff figure for a unit as of a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffQuote {
    pub unit_id: UnitId,
    pub as_of: NaiveDate,
    pub principal_balance: Decimal,
    pub unpaid_interest: Decimal,
    pub payoff_fee: Decimal,
    pub total: Decimal,
}

/// Filter for unit listings. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitFilter {
    #[serde(default)]
    pub status: Option<UnitStatus>,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub dealer_id: Option<DealerId>,
    #[serde(default)]
    pub past_due_only: bool,
}

impl UnitFilter {
    pub fn matches(&self, unit: &UnitFloorPlan) -> bool {
        self.status.map_or(true, |status| unit.status == status)
            && self
                .account_id
                .map_or(true, |account_id| unit.account_id == account_id)
            && self
                .dealer_id
                .as_ref()
                .map_or(true, |dealer_id| &unit.dealer_id == dealer_id)
            && (!self.past_due_only || unit.is_past_due)
    }
}

/// Active unit joined with its account and provider name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlooredUnit {
    pub unit: UnitFloorPlan,
    pub account: Account,
    pub provider_name: String,
}

/// Account joined with its provider name. Serializes as the account's fields plus
/// `provider_name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountWithProvider {
    #[serde(flatten)]
    pub account: Account,
    pub provider_name: String,
}

fn default_true() -> bool {
    true
}
