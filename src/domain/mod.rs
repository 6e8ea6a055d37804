//! Domain layer: value types and the store port the ledger depends on.

pub mod account;
pub mod ports;
