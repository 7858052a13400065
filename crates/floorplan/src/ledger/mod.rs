//! Floor plan ledger: providers, dealer credit lines, financed units, and the append-only
//! payment history that explains every balance change.

pub mod domain;
pub mod export;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Account, AccountId, AccountStatus, AccountWithProvider, DealerId, FlooredUnit,
    InterestCalculation, InterestType, ListingId, NewAccount, NewProvider, NewUnit, Payment,
    PaymentId, PaymentRequest, PaymentType, PayoffQuote, Provider, ProviderId, ProviderUpdate,
    UnitFilter, UnitFloorPlan, UnitId, UnitStatus,
};
pub use export::write_payments_csv;
pub use router::{ledger_router, UnitView};
pub use service::{AccrualSummary, FloorPlanLedger, LedgerError, PaymentReceipt};
pub use store::{LedgerReader, LedgerStore, LedgerWriter, StoreError};
