//! Service boundaries: translate untrusted input into ledger calls.

pub mod csv;
pub mod http;
