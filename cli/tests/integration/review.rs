//! Timestamp sanity integration tests for msync CLI.
//!
//! Files whose modification times predate 1980 or sit more than a day in the
//! future are never copied on the strength of the comparison. They are
//! listed for manual review and the run still succeeds.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[path = "../common/mod.rs"]
mod common;

use common::{TestFixture, set_mtime};

#[test]
fn test_ancient_source_mtime_is_flagged_for_review() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "new");
    fx.write_dst("a.txt", "old");
    set_mtime(
        &fx.src.path().join("a.txt"),
        UNIX_EPOCH + Duration::from_secs(3600),
    );

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1 file(s) skipped due to timestamp issues",
        ))
        .stdout(predicate::str::contains("review:"))
        .stdout(predicate::str::contains("predates 1980-01-01"));

    fx.assert_dst_content("a.txt", "old");
}

#[test]
fn test_future_destination_mtime_is_flagged_for_review() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "new");
    fx.write_dst("a.txt", "old");
    set_mtime(
        &fx.dst.path().join("a.txt"),
        SystemTime::now() + Duration::from_secs(3 * 86_400),
    );

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("in the future"));

    fx.assert_dst_content("a.txt", "old");
}

#[test]
fn test_bad_timestamp_on_missing_destination_still_copies() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "content");
    set_mtime(&fx.src.path().join("a.txt"), UNIX_EPOCH);

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("review:").not());

    fx.assert_dst_content("a.txt", "content");
}

#[test]
fn test_review_entries_in_json() {
    let fx = TestFixture::new();
    fx.write_src("ok.txt", "fine");
    fx.write_src("sub/bad.txt", "new");
    fx.write_dst("sub/bad.txt", "old");
    set_mtime(&fx.src.path().join("sub/bad.txt"), UNIX_EPOCH);

    let output = cargo_bin_cmd!("msync")
        .args(["--output", "json"])
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let stats = &value["stats"];
    assert_eq!(stats["files_copied"], 1);
    assert_eq!(stats["files_skipped_timestamp"], 1);

    let review = stats["files_with_timestamp_issues"].as_array().unwrap();
    assert_eq!(review.len(), 1);
    assert!(review[0]["source"].as_str().unwrap().ends_with("bad.txt"));
    assert!(
        review[0]["detail"]
            .as_str()
            .unwrap()
            .contains("predates 1980-01-01")
    );
}
