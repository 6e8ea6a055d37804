#![allow(dead_code)]

use kvledger::application::ledger::BalanceLedger;
use kvledger::domain::account::Username;
use kvledger::infrastructure::in_memory::InMemoryKvStore;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

pub fn user(name: &str) -> Username {
    Username::new(name).expect("valid username")
}

pub fn in_memory_ledger() -> Arc<BalanceLedger> {
    Arc::new(BalanceLedger::new(Box::new(InMemoryKvStore::new())))
}

/// Writes `rows` under an `op, username, amount` header.
pub fn ops_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "op, username, amount").unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}
