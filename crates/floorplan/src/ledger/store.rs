use super::domain::{
    Account, AccountId, AccountStatus, AccountWithProvider, DealerId, FlooredUnit, ListingId,
    Payment, Provider, ProviderId, UnitFilter, UnitFloorPlan, UnitId,
};

/// Failure reported by the backing relational store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store could not guarantee all-or-nothing application of a transaction.
    #[error("partial write detected: {0}")]
    PartialWrite(String),
}

/// Read access to ledger state. Reads inside a transaction observe its uncommitted writes.
pub trait LedgerReader {
    fn provider(&self, id: ProviderId) -> Result<Option<Provider>, StoreError>;
    fn providers(&self) -> Result<Vec<Provider>, StoreError>;
    fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
    fn accounts(
        &self,
        dealer_id: Option<&DealerId>,
        status: Option<AccountStatus>,
    ) -> Result<Vec<AccountWithProvider>, StoreError>;
    fn unit(&self, id: UnitId) -> Result<Option<UnitFloorPlan>, StoreError>;
    fn active_unit_for_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Option<UnitFloorPlan>, StoreError>;
    fn units(&self, filter: &UnitFilter) -> Result<Vec<UnitFloorPlan>, StoreError>;
    /// Active units joined with their account and provider.
    fn floored_units(&self, dealer_id: Option<&DealerId>) -> Result<Vec<FlooredUnit>, StoreError>;
    fn payments(&self, unit_id: UnitId) -> Result<Vec<Payment>, StoreError>;
}

/// Mutations available inside a transaction.
pub trait LedgerWriter: LedgerReader {
    fn insert_provider(&mut self, provider: Provider) -> Result<(), StoreError>;
    fn update_provider(&mut self, provider: Provider) -> Result<(), StoreError>;
    fn insert_account(&mut self, account: Account) -> Result<(), StoreError>;
    fn update_account(&mut self, account: Account) -> Result<(), StoreError>;
    fn insert_unit(&mut self, unit: UnitFloorPlan) -> Result<(), StoreError>;
    fn update_unit(&mut self, unit: UnitFloorPlan) -> Result<(), StoreError>;
    fn insert_payment(&mut self, payment: Payment) -> Result<(), StoreError>;
}

/// Transactional store handle injected into the ledger.
///
/// `transaction` runs `work` with serializable isolation: concurrent transactions never observe
/// each other's uncommitted state, and an `Err` from `work` discards every write it made.
pub trait LedgerStore: Send + Sync {
    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn LedgerReader) -> Result<T, E>,
        E: From<StoreError>;

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn LedgerWriter) -> Result<T, E>,
        E: From<StoreError>;
}
