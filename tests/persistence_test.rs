#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: create and fund an account
    let csv1 = common::ops_csv(&["create, alice,", "increase, alice, 100"]);

    let mut cmd1 = Command::new(cargo_bin!("kvledger"));
    cmd1.env_remove("REDIS_URL")
        .arg("--db-path")
        .arg(&db_path)
        .arg("apply")
        .arg(csv1.path());

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("alice,100"));

    // 2. Second run against the same database
    let csv2 = common::ops_csv(&["create, alice,", "decrease, alice, 40"]);

    let mut cmd2 = Command::new(cargo_bin!("kvledger"));
    cmd2.env_remove("REDIS_URL")
        .arg("--db-path")
        .arg(&db_path)
        .arg("apply")
        .arg(csv2.path());

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // The repeated create must not have reset the recovered balance
    assert!(stdout2.contains("alice,60"));
}
