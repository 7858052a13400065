//! Floor plan financing engine for dealer inventory credit lines.

pub mod alerts;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod finance;
pub mod ledger;
pub mod scheduler;
pub mod store;
pub mod telemetry;
