#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

fn run(rows: &[(&str, &str)], db_path: &std::path::Path) -> String {
    let csv = tempfile::NamedTempFile::new().unwrap();
    common::write_checkouts(csv.path(), rows).unwrap();

    let output = Command::new(cargo_bin!("pressing-checkout"))
        .arg(csv.path())
        .arg("--db-path")
        .arg(db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_failed_session_resumes_with_retry_count() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: the wallet is short of funds
    let stdout = run(&[("s-1", "0712345601")], &db_path);
    assert!(stdout.contains("s-1,failed,,,insufficient_funds,0,"));

    // 2. Second run: same session, another number, counted as a retry
    let stdout = run(&[("s-1", "0712345678")], &db_path);
    assert!(stdout.contains("s-1,success,"));
    assert!(stdout.contains(",1,4,0,"));

    // 3. The settled draft was removed: the session starts fresh
    let stdout = run(&[("s-1", "0712345678")], &db_path);
    assert!(stdout.contains(",0,4,0,"));
}

#[test]
fn test_retry_cap_holds_across_runs() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    for _ in 0..4 {
        let stdout = run(&[("s-1", "0712345601")], &db_path);
        assert!(stdout.contains("s-1,failed,"));
    }

    let stdout = run(&[("s-1", "0712345678")], &db_path);
    assert!(stdout.contains("s-1,rejected,,,,3,0,0,Retry limit of 3 attempts reached"));
}
