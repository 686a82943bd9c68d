//! Marker-guarded file copy.
//!
//! The protocol for one file:
//!
//! 1. Write the marker (`<destination>.transferring`). When fsync is on, the
//!    marker and its directory entry are flushed before any content moves.
//! 2. Copy content, permissions and timestamps over the destination.
//! 3. On success, delete the marker.
//! 4. On failure, apply the [`FailurePolicy`] to the marker and report
//!    [`CopyOutcome::Failed`].
//!
//! Between steps 1 and 3 the destination may be absent, empty, or partially
//! written. The marker is what tells the next run not to trust it.

use crate::error::{Error, Result};
use crate::options::{FailurePolicy, SyncOptions};
use filetime::{FileTime, set_file_times};
use std::fs::{self, File, Metadata};
use std::io;
use std::path::Path;

use super::entry::Entry;
use super::stats::CopyOutcome;

/// Copy `entry.source` over `entry.destination` under the marker protocol.
///
/// Only call this when [`decide`](crate::decide) said to copy. `is_resume`
/// selects [`CopyOutcome::Resumed`] over [`CopyOutcome::Copied`] on success.
///
/// Never returns [`CopyOutcome::Skipped`] or
/// [`CopyOutcome::SkippedTimestampIssue`].
///
/// # Example
///
/// ```no_run
/// use marksync::{copy_guarded, CopyOutcome, Entry, SyncOptions};
///
/// let entry = Entry::new("src/a.txt", "dst/a.txt");
/// match copy_guarded(&entry, entry.marker_exists(), &SyncOptions::default()) {
///     CopyOutcome::Failed(e) => eprintln!("{e}"),
///     outcome => println!("{outcome:?}"),
/// }
/// ```
pub fn copy_guarded(entry: &Entry, is_resume: bool, options: &SyncOptions) -> CopyOutcome {
    if let Err(source) = entry.write_marker(options.fsync) {
        let error = Error::MarkerWrite {
            path: entry.marker.clone(),
            source,
        };
        apply_failure_policy(entry, options);
        return CopyOutcome::Failed(error);
    }

    let bytes = match copy_content(entry, options) {
        Ok(bytes) => bytes,
        Err(error) => {
            apply_failure_policy(entry, options);
            return CopyOutcome::Failed(error);
        }
    };

    if let Err(source) = entry.remove_marker() {
        return CopyOutcome::Failed(Error::MarkerRemove {
            path: entry.marker.clone(),
            source,
        });
    }

    if is_resume {
        CopyOutcome::Resumed { bytes }
    } else {
        CopyOutcome::Copied { bytes }
    }
}

fn apply_failure_policy(entry: &Entry, options: &SyncOptions) {
    match options.on_failure {
        FailurePolicy::KeepMarker => {}
        FailurePolicy::RemoveMarker => {
            // Secondary failure: must not replace the copy error.
            if let Err(e) = entry.remove_marker() {
                if e.kind() != io::ErrorKind::NotFound {
                    options.verbose(&format!(
                        "could not remove marker {} after failed copy: {}",
                        entry.marker.display(),
                        e
                    ));
                }
            }
        }
    }
}

fn copy_content(entry: &Entry, options: &SyncOptions) -> Result<u64> {
    let src = entry.source.as_path();
    let dst = entry.destination.as_path();
    let src_err = |source| Error::Copy {
        path: src.to_path_buf(),
        source,
    };
    let dst_err = |source| Error::Copy {
        path: dst.to_path_buf(),
        source,
    };

    let src_meta = fs::metadata(src).map_err(src_err)?;

    match fs::symlink_metadata(dst) {
        Ok(meta) if meta.is_dir() => return Err(Error::DestinationIsDirectory(dst.to_path_buf())),
        // Unlink rather than truncate: a read-only destination or a symlink
        // must be replaced, not written through.
        Ok(_) => fs::remove_file(dst).map_err(dst_err)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(dst_err(e)),
    }

    let src_file = File::open(src).map_err(src_err)?;
    let dst_file = File::create(dst).map_err(dst_err)?;

    let bytes = copy_file_contents(&src_file, &dst_file, src_meta.len()).map_err(dst_err)?;

    if options.fsync {
        dst_file.sync_all().map_err(dst_err)?;
    }
    drop(dst_file);

    if options.preserve_permissions {
        fs::set_permissions(dst, src_meta.permissions()).map_err(dst_err)?;
    }

    if options.preserve_timestamps {
        if let Err(e) = preserve_timestamps(&src_meta, dst) {
            options.warn(&format!(
                "Failed to preserve timestamps on {}: {}",
                dst.display(),
                e
            ));
        }
    }

    Ok(bytes)
}

/// Copy file contents using the best available method.
///
/// On Linux, uses `copy_file_range` for an in-kernel copy and falls back to
/// `std::io::copy` where the filesystem does not support it.
fn copy_file_contents(src: &File, dst: &File, len: u64) -> io::Result<u64> {
    #[cfg(target_os = "linux")]
    {
        copy_file_range_all(src, dst, len)
    }
    #[cfg(not(target_os = "linux"))]
    {
        use std::io::BufReader;
        let _ = len;
        io::copy(&mut BufReader::new(src), &mut &*dst)
    }
}

#[cfg(target_os = "linux")]
fn copy_file_range_all(src: &File, dst: &File, len: u64) -> io::Result<u64> {
    use std::io::BufReader;
    use std::os::unix::io::AsRawFd;

    const CHUNK: u64 = 128 * 1024 * 1024;

    let src_fd = src.as_raw_fd();
    let dst_fd = dst.as_raw_fd();
    let mut remaining = len;
    let mut copied: u64 = 0;

    while remaining > 0 {
        let chunk_size = remaining.min(CHUNK) as usize;

        // SAFETY: both descriptors are open for the lifetime of the borrow;
        // null offsets make the kernel use and advance the file positions.
        let result = unsafe {
            libc::copy_file_range(
                src_fd,
                std::ptr::null_mut(),
                dst_fd,
                std::ptr::null_mut(),
                chunk_size,
                0,
            )
        };

        if result < 0 {
            let err = io::Error::last_os_error();
            if copied == 0
                && matches!(
                    err.raw_os_error(),
                    Some(libc::EXDEV | libc::ENOSYS | libc::EINVAL | libc::EOPNOTSUPP)
                )
            {
                return io::copy(&mut BufReader::new(src), &mut &*dst);
            }
            return Err(err);
        }

        if result == 0 {
            // Source shrank while copying
            break;
        }

        copied += result as u64;
        remaining = remaining.saturating_sub(result as u64);
    }

    Ok(copied)
}

fn preserve_timestamps(src_meta: &Metadata, dst: &Path) -> io::Result<()> {
    let mtime = FileTime::from_last_modification_time(src_meta);
    let atime = FileTime::from_last_access_time(src_meta);
    set_file_times(dst, atime, mtime)
}
