//! Batch interface: ledger operations in, balances out.

pub mod balance_writer;
pub mod operation_reader;
