//! Common test utilities for integration tests.

#![allow(dead_code)]

use filetime::{FileTime, set_file_mtime};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A test fixture that provides source and destination directories.
pub struct TestFixture {
    pub src: TempDir,
    pub dst: TempDir,
}

impl TestFixture {
    /// Create a new test fixture with fresh source and destination directories.
    pub fn new() -> Self {
        Self {
            src: TempDir::new().expect("Failed to create temp source dir"),
            dst: TempDir::new().expect("Failed to create temp dest dir"),
        }
    }

    /// Write a source file, creating parent directories as needed.
    pub fn write_src(&self, rel: &str, content: &str) {
        write_file(&self.src.path().join(rel), content);
    }

    /// Write a destination file, creating parent directories as needed.
    pub fn write_dst(&self, rel: &str, content: &str) {
        write_file(&self.dst.path().join(rel), content);
    }

    /// Leave a transfer marker next to a destination file.
    pub fn leave_marker(&self, rel: &str) {
        write_file(
            &self.dst.path().join(format!("{rel}.transferring")),
            "started=0\n",
        );
    }

    pub fn marker_exists(&self, rel: &str) -> bool {
        self.dst
            .path()
            .join(format!("{rel}.transferring"))
            .exists()
    }

    /// Check if a destination file exists and has the expected content.
    pub fn assert_dst_content(&self, rel: &str, expected: &str) {
        let path = self.dst.path().join(rel);
        assert!(path.exists(), "File does not exist: {:?}", path);
        let actual = fs::read_to_string(&path).expect("Failed to read file");
        assert_eq!(actual, expected, "File content mismatch");
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, content).expect("Failed to write file");
}

/// Set a file's mtime to `seconds_ago` before now.
pub fn set_age(path: &Path, seconds_ago: u64) {
    let time = SystemTime::now() - Duration::from_secs(seconds_ago);
    set_file_mtime(path, FileTime::from_system_time(time)).expect("Failed to set mtime");
}

/// Set a file's mtime to an absolute time.
pub fn set_mtime(path: &Path, time: SystemTime) {
    set_file_mtime(path, FileTime::from_system_time(time)).expect("Failed to set mtime");
}

/// Count all files in a directory recursively.
pub fn count_files_recursive(dir: &Path) -> usize {
    let mut count = 0;
    if dir.is_dir() {
        for entry in fs::read_dir(dir).expect("Failed to read directory") {
            let entry = entry.expect("Failed to read entry");
            let path = entry.path();
            if path.is_dir() {
                count += count_files_recursive(&path);
            } else {
                count += 1;
            }
        }
    }
    count
}
