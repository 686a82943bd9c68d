//! Basic functionality integration tests for msync CLI.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;

#[path = "../common/mod.rs"]
mod common;

use common::{TestFixture, count_files_recursive, set_age};

#[test]
fn test_sync_into_empty_destination() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");
    fx.write_src("sub/b.txt", "beta");

    let mut cmd = cargo_bin_cmd!("msync");
    cmd.arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Files copied:      2"))
        .stdout(predicate::str::contains("Directories:       1"));

    fx.assert_dst_content("a.txt", "alpha");
    fx.assert_dst_content("sub/b.txt", "beta");
    assert!(!fx.marker_exists("a.txt"));
    assert!(!fx.marker_exists("sub/b.txt"));
}

#[test]
fn test_destination_root_is_created() {
    let fx = TestFixture::new();
    fx.write_src("x/y/z.txt", "deep");

    let target = fx.dst.path().join("new/backup");
    let mut cmd = cargo_bin_cmd!("msync");
    cmd.arg("-q")
        .arg(fx.src.path())
        .arg(&target)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(target.join("x/y/z.txt")).unwrap(), "deep");
}

#[test]
fn test_second_run_has_nothing_to_sync() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "a");
    fx.write_src("d/b.txt", "b");

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success();

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to sync (2 files up to date)"));
}

#[test]
fn test_newer_destination_is_not_overwritten() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "source");
    fx.write_dst("a.txt", "destination");
    set_age(&fx.src.path().join("a.txt"), 7200);
    set_age(&fx.dst.path().join("a.txt"), 3600);

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success();

    fx.assert_dst_content("a.txt", "destination");
}

#[test]
fn test_stale_destination_is_updated() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "fresh");
    fx.write_dst("a.txt", "old");
    set_age(&fx.src.path().join("a.txt"), 60);
    set_age(&fx.dst.path().join("a.txt"), 3600);

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success();

    fx.assert_dst_content("a.txt", "fresh");
}

#[test]
fn test_parallel_jobs() {
    let fx = TestFixture::new();
    for d in 0..3 {
        for f in 0..10 {
            fx.write_src(&format!("dir{d}/file{f}.txt"), &format!("{d}:{f}"));
        }
    }

    cargo_bin_cmd!("msync")
        .args(["-q", "-j", "4"])
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Files copied:      30"));

    assert_eq!(count_files_recursive(fx.dst.path()), 30);
    fx.assert_dst_content("dir2/file7.txt", "2:7");
}

#[test]
fn test_json_output() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "alpha");
    fx.write_src("sub/b.txt", "beta");

    let output = cargo_bin_cmd!("msync")
        .args(["--output", "json"])
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["schema_version"], "1.0");
    assert_eq!(value["orphaned_markers"], 0);
    assert_eq!(value["stats"]["files_copied"], 2);
    assert_eq!(value["stats"]["dirs_created"], 1);
    assert_eq!(value["stats"]["bytes_copied"], 9);
    assert!(value["stats"]["failures"].as_array().unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn test_permissions_preserved_unless_disabled() {
    use std::os::unix::fs::PermissionsExt;

    let fx = TestFixture::new();
    fx.write_src("script.sh", "#!/bin/sh\necho hi\n");
    fs::set_permissions(
        fx.src.path().join("script.sh"),
        fs::Permissions::from_mode(0o750),
    )
    .unwrap();

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success();

    let mode = fs::metadata(fx.dst.path().join("script.sh"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o750);
}

#[test]
fn test_timestamps_preserved() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "a");
    set_age(&fx.src.path().join("a.txt"), 86_400);

    cargo_bin_cmd!("msync")
        .arg("-q")
        .arg(fx.src.path())
        .arg(fx.dst.path())
        .assert()
        .success();

    let src_mtime = fs::metadata(fx.src.path().join("a.txt"))
        .unwrap()
        .modified()
        .unwrap();
    let dst_mtime = fs::metadata(fx.dst.path().join("a.txt"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(src_mtime, dst_mtime);
}
