//! Application layer containing the balance ledger.
//!
//! `BalanceLedger` is the entry point every service boundary (HTTP, CLI,
//! batch) calls into. It is shared between request handlers behind an `Arc`
//! and delegates all state to the injected store.

pub mod ledger;
