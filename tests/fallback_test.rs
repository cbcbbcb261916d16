mod common;

use alipay_gateway::domain::protocol::{Protocol, SignatureScheme};
use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

fn notification() -> alipay_gateway::domain::params::ParameterSet {
    acquirer_signed(
        Protocol::Modern,
        SignatureScheme::RsaSha256,
        &[
            ("out_trade_no", "SO1001"),
            ("trade_no", "2017A"),
            ("trade_status", "TRADE_SUCCESS"),
        ],
    )
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "modern", "RSA2", "");
    let transactions = write_transactions(dir.path(), &[(1, "SO1001", "10.00")]);
    let notifications = write_notifications(dir.path(), &[notification()]);

    let mut cmd = Command::new(cargo_bin!("alipay-gateway"));
    cmd.arg("--config")
        .arg(&config)
        .arg("notify")
        .arg(&notifications)
        .arg("--transactions")
        .arg(&transactions)
        .arg("--db-path")
        .arg("some_db");

    cmd.assert()
        .success()
        .stdout("success\n")
        .stderr(predicate::str::contains("WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let config = write_config(dir.path(), "modern", "RSA2", "");
    let transactions = write_transactions(dir.path(), &[(1, "SO1001", "10.00")]);
    let notifications = write_notifications(dir.path(), &[notification()]);
    let state_out = dir.path().join("state.csv");

    // First run settles the transaction.
    Command::new(cargo_bin!("alipay-gateway"))
        .arg("--config")
        .arg(&config)
        .arg("notify")
        .arg(&notifications)
        .arg("--transactions")
        .arg(&transactions)
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success()
        .stdout("success\n")
        .stderr(predicate::str::contains("WARNING").not());

    // Reloading the CSV must not reset it; the redelivery is a duplicate.
    Command::new(cargo_bin!("alipay-gateway"))
        .arg("--config")
        .arg(&config)
        .arg("notify")
        .arg(&notifications)
        .arg("--transactions")
        .arg(&transactions)
        .arg("--db-path")
        .arg(&db_path)
        .arg("--state-out")
        .arg(&state_out)
        .assert()
        .success()
        .stdout("success\n");

    let state = std::fs::read_to_string(&state_out).unwrap();
    assert!(state.contains("1,SO1001,10.00,CNY,done,2017A"));
}
