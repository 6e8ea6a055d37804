use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let csv = common::ops_csv(&["create, alice,", "increase, alice, 100"]);

    let mut cmd = Command::new(cargo_bin!("kvledger"));
    cmd.env_remove("REDIS_URL")
        .env("RUST_LOG", "warn")
        .arg("--db-path")
        .arg("some_db")
        .arg("apply")
        .arg(csv.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back to in-memory storage"))
        .stdout(predicate::str::contains("alice,100"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let csv = common::ops_csv(&["create, alice,", "increase, alice, 100"]);

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("kvledger"));
    cmd.env_remove("REDIS_URL")
        .arg("--db-path")
        .arg(&db_path)
        .arg("apply")
        .arg(csv.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back").not());
}
