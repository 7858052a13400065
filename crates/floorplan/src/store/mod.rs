//! Store backends for the ledger and alert tables.

mod memory;

pub use memory::InMemoryStore;
