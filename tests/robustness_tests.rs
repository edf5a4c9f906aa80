mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_rows_are_skipped() {
    let output_path = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(output_path.path()).unwrap();
    wtr.write_record(common::CHECKOUT_HEADER).unwrap();

    // Valid cash checkout
    wtr.write_record(["s-1", "cash_on_delivery", "", "", "5000", "", "", "", "", "", "", "", "", ""])
        .unwrap();
    // Unknown payment method
    wtr.write_record(["s-2", "bitcoin", "", "", "5000", "", "", "", "", "", "", "", "", ""])
        .unwrap();
    // Text in subtotal
    wtr.write_record(["s-3", "cash_on_delivery", "", "", "lots", "", "", "", "", "", "", "", "", ""])
        .unwrap();
    // Discount swallows the whole amount
    wtr.write_record(["s-4", "cash_on_delivery", "", "", "5000", "0", "5000", "", "", "", "", "", "", ""])
        .unwrap();
    // Valid wallet checkout
    wtr.write_record(["s-5", "wallet_transfer", "moov", "0112345678", "3000", "", "", "", "", "", "", "", "", ""])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("pressing-checkout"));
    cmd.arg(output_path.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("skipping unreadable checkout row"))
        .stdout(predicate::str::contains("s-1,success"))
        .stdout(predicate::str::contains("s-5,success"))
        .stdout(predicate::str::contains("s-2").not())
        .stdout(predicate::str::contains("s-3").not())
        .stdout(predicate::str::contains("s-4").not());
}

#[test]
fn test_missing_method_is_rejected() {
    let output_path = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(output_path.path()).unwrap();
    wtr.write_record(common::CHECKOUT_HEADER).unwrap();
    wtr.write_record(["s-1", "", "", "", "5000", "", "", "", "", "", "", "", "", ""])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("pressing-checkout"));
    cmd.arg(output_path.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("s-1,rejected,,,,0,0,0,"));
}
