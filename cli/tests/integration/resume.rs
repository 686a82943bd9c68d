//! Resumable transfer integration tests for msync CLI.
//!
//! A `<file>.transferring` marker left in the destination means an earlier
//! copy never finished. These tests verify:
//! - The pre-scan reports how many transfers will resume
//! - A marker forces a re-copy even when the destination looks newer
//! - Markers are gone after a successful run
//! - A failed copy keeps its marker so the next run retries it

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;

#[path = "../common/mod.rs"]
mod common;

use common::{TestFixture, set_age};

/// Simulate a crash mid-copy: truncated destination plus its marker.
#[test]
fn test_interrupted_copy_is_redone() {
    let fx = TestFixture::new();
    fx.write_src("video.bin", "0123456789abcdef");
    fx.write_dst("video.bin", "01234");
    fx.leave_marker("video.bin");
    set_age(&fx.src.path().join("video.bin"), 7200);
    set_age(&fx.dst.path().join("video.bin"), 60);

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 incomplete transfer(s) will resume"))
        .stdout(predicate::str::contains("Transfers resumed: 1"));

    fx.assert_dst_content("video.bin", "0123456789abcdef");
    assert!(!fx.marker_exists("video.bin"));
}

#[test]
fn test_marker_without_destination_file() {
    let fx = TestFixture::new();
    fx.write_src("nested/a.txt", "content");
    fx.leave_marker("nested/a.txt");

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success();

    fx.assert_dst_content("nested/a.txt", "content");
    assert!(!fx.marker_exists("nested/a.txt"));
}

#[test]
fn test_prescan_counts_nested_markers() {
    let fx = TestFixture::new();
    for rel in ["a.txt", "x/b.txt", "x/y/c.txt"] {
        fx.write_src(rel, rel);
        fx.write_dst(rel, "partial");
        fx.leave_marker(rel);
    }
    fx.write_src("untouched.txt", "u");

    let output = cargo_bin_cmd!("msync")
        .args(["--output", "json"])
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["orphaned_markers"], 3);
    assert_eq!(value["stats"]["transfers_resumed"], 3);
    assert_eq!(value["stats"]["files_copied"], 4);

    for rel in ["a.txt", "x/b.txt", "x/y/c.txt"] {
        fx.assert_dst_content(rel, rel);
        assert!(!fx.marker_exists(rel));
    }
}

/// A copy that fails keeps its marker, and the next run picks it up.
#[test]
fn test_failed_copy_is_retried_next_run() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "content");
    fx.write_src("b.txt", "other");
    // A directory in the way makes the copy of a.txt fail
    fs::create_dir(fx.dst.path().join("a.txt")).unwrap();
    set_age(&fx.dst.path().join("a.txt"), 3600);

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed:"))
        .stdout(predicate::str::contains("a.txt"));

    assert!(fx.marker_exists("a.txt"));
    fx.assert_dst_content("b.txt", "other");

    fs::remove_dir(fx.dst.path().join("a.txt")).unwrap();

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 incomplete transfer(s) will resume"));

    fx.assert_dst_content("a.txt", "content");
    assert!(!fx.marker_exists("a.txt"));
}

#[test]
fn test_remove_marker_policy() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "content");
    fs::create_dir(fx.dst.path().join("a.txt")).unwrap();
    set_age(&fx.dst.path().join("a.txt"), 3600);

    cargo_bin_cmd!("msync")
        .args(["-q", "--on-failure", "remove-marker"])
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .code(1);

    assert!(!fx.marker_exists("a.txt"));
}

#[test]
fn test_source_file_named_like_marker_is_not_copied() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "a");
    fx.write_src("a.txt.transferring", "looks like a marker");

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("collides with transfer markers"));

    fx.assert_dst_content("a.txt", "a");
    assert!(!fx.marker_exists("a.txt"));
}
