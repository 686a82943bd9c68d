//! Per-file entries and their transfer markers.
//!
//! A marker is a small file next to the destination, named
//! `<destination>` + [`MARKER_SUFFIX`]. It exists exactly while a copy of
//! that destination is in flight, so finding one at the start of a run means
//! the previous copy never finished. Only its existence matters; the content
//! is a human-readable note and is never parsed.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Suffix appended to a destination path to form its marker path.
pub const MARKER_SUFFIX: &str = ".transferring";

/// Derive the marker path for a destination file.
///
/// ```
/// use marksync::marker_path;
/// use std::path::Path;
///
/// assert_eq!(
///     marker_path(Path::new("/backup/a.txt")),
///     Path::new("/backup/a.txt.transferring"),
/// );
/// ```
pub fn marker_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(MARKER_SUFFIX);
    PathBuf::from(name)
}

/// Returns true if a file name carries the marker suffix.
pub fn is_marker_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().ends_with(MARKER_SUFFIX.as_bytes())
}

/// A source file paired with its destination and marker paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Source file
    pub source: PathBuf,
    /// Destination file
    pub destination: PathBuf,
    /// Marker guarding the destination
    pub marker: PathBuf,
}

impl Entry {
    /// Build an entry, deriving the marker path from the destination.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        let destination = destination.into();
        Self {
            source: source.into(),
            marker: marker_path(&destination),
            destination,
        }
    }

    /// Returns true if a marker is present for this destination.
    ///
    /// Does not follow symlinks: a dangling link named like a marker still
    /// counts.
    pub fn marker_exists(&self) -> bool {
        fs::symlink_metadata(&self.marker).is_ok()
    }

    /// Create (or truncate) the marker.
    pub(crate) fn write_marker(&self, fsync: bool) -> io::Result<()> {
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let mut file = File::create(&self.marker)?;
        writeln!(file, "started={started}")?;
        writeln!(file, "source={}", self.source.display())?;
        if fsync {
            file.sync_all()?;
            sync_parent_dir(&self.marker)?;
        }
        Ok(())
    }

    pub(crate) fn remove_marker(&self) -> io::Result<()> {
        fs::remove_file(&self.marker)
    }
}

/// Flush the directory entry of `path` so a new file survives power loss.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

// Directories cannot be opened for syncing here.
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
