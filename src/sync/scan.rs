//! Read-only scan for markers left behind by interrupted runs.

use crate::options::SyncOptions;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::entry::is_marker_name;

/// Markers found in a destination tree before syncing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OrphanScan {
    /// Marker files, in lexical walk order
    pub markers: Vec<PathBuf>,
    /// Directories that could not be scanned
    pub warnings: Vec<String>,
}

impl OrphanScan {
    /// Number of interrupted transfers the next sync will redo.
    pub fn count(&self) -> usize {
        self.markers.len()
    }
}

/// Count leftover transfer markers under `destination`.
///
/// Purely informational: nothing is modified, and the markers are handled
/// by the sync itself. A missing destination yields an empty scan.
/// Directories that cannot be read are skipped with a warning.
///
/// # Example
///
/// ```no_run
/// use marksync::{scan_orphans, SyncOptions};
/// use std::path::Path;
///
/// let scan = scan_orphans(Path::new("/mnt/backup"), &SyncOptions::default());
/// if scan.count() > 0 {
///     println!("{} incomplete transfers will resume", scan.count());
/// }
/// ```
pub fn scan_orphans(destination: &Path, options: &SyncOptions) -> OrphanScan {
    let mut scan = OrphanScan::default();
    match fs::metadata(destination) {
        Ok(meta) if meta.is_dir() => scan_dir(destination, options, &mut scan),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => note(&mut scan, options, destination, &e),
    }
    scan
}

fn scan_dir(dir: &Path, options: &SyncOptions, scan: &mut OrphanScan) {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            note(scan, options, dir, &e);
            return;
        }
    };

    let mut entries = Vec::new();
    for entry in read_dir {
        match entry.and_then(|e| e.file_type().map(|ft| (e.file_name(), ft))) {
            Ok(item) => entries.push(item),
            Err(e) => note(scan, options, dir, &e),
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, file_type) in entries {
        let path = dir.join(&name);
        if file_type.is_dir() {
            scan_dir(&path, options, scan);
        } else if is_marker_name(&name) {
            scan.markers.push(path);
        }
    }
}

fn note(scan: &mut OrphanScan, options: &SyncOptions, path: &Path, error: &io::Error) {
    let msg = format!("Skipping {} during marker scan: {}", path.display(), error);
    options.warn(&msg);
    scan.warnings.push(msg);
}
