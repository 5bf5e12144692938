//! Optimistic-CAS billing ledger: per-tenant credit balance and append-only
//! transaction ledger.

pub mod ledger;

pub use ledger::BillingLedger;
