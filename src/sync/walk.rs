//! Recursive directory mirroring.
//!
//! The walk goes top-down: create the destination directory, decide and copy
//! each file, then recurse into subdirectories. Each directory returns a
//! fresh [`SyncStats`] that its parent merges, so no counters are shared
//! between branches.
//!
//! With `parallel > 1`, sibling files and sibling subdirectories run on a
//! rayon pool. Each file's marker protocol stays on one thread, and results
//! are merged in lexical order, so stats match the sequential walk exactly.

use crate::error::{Error, Result};
use crate::options::SyncOptions;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::decide::{Reason, decide};
use super::entry::{Entry, is_marker_name};
use super::stats::{CopyOutcome, FailedEntry, SyncStats};
use super::transfer::copy_guarded;

/// Mirror `source` into `destination` with default options.
///
/// # Example
///
/// ```no_run
/// let stats = marksync::sync("src", "dst")?;
/// println!("Copied {} files, skipped {}", stats.files_copied, stats.files_skipped);
/// # Ok::<(), marksync::Error>(())
/// ```
///
/// # Errors
///
/// See [`sync_dir`].
pub fn sync<P: AsRef<Path>, Q: AsRef<Path>>(source: P, destination: Q) -> Result<SyncStats> {
    sync_dir(source.as_ref(), destination.as_ref(), &SyncOptions::default())
}

/// Mirror `source` into `destination`.
///
/// Files are copied when they are new, newer than their destination
/// counterpart, or left half-copied by an earlier run. Per-file and
/// per-directory problems are recorded in the returned stats and do not
/// stop the walk.
///
/// # Errors
///
/// Returns an error if:
/// - Source does not exist ([`Error::SourceNotFound`])
/// - Source is not a directory ([`Error::NotADirectory`])
/// - Destination root cannot be created ([`Error::CreateDir`])
/// - The cancellation token stopped the walk before every file and
///   directory was visited ([`Error::Cancelled`]). A token set after the
///   last file finished does not turn a complete run into a cancelled one.
pub fn sync_dir(source: &Path, destination: &Path, options: &SyncOptions) -> Result<SyncStats> {
    match fs::metadata(source) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(Error::NotADirectory(source.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    }

    let root_created = ensure_dir(destination, true).map_err(|source| Error::CreateDir {
        path: destination.to_path_buf(),
        source,
    })?;

    let source = fs::canonicalize(source)?;
    let destination = fs::canonicalize(destination)?;
    let walk = Walk {
        options,
        // A destination nested inside the source must not be mirrored into itself
        exclude: destination.starts_with(&source).then(|| destination.clone()),
        cut_short: AtomicBool::new(false),
    };

    let mut stats = SyncStats {
        dirs_created: u64::from(root_created),
        ..SyncStats::default()
    };
    stats = stats.merge(run_in_pool(options, || walk.dir(&source, &destination, 0)));

    if walk.cut_short.load(Ordering::Relaxed) {
        return Err(Error::Cancelled {
            stats: Box::new(stats),
        });
    }

    Ok(stats)
}

fn run_in_pool<F>(options: &SyncOptions, f: F) -> SyncStats
where
    F: FnOnce() -> SyncStats + Send,
{
    if options.parallel == rayon::current_num_threads() {
        return f();
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(options.parallel)
        .build()
    {
        Ok(pool) => pool.install(f),
        Err(e) => {
            options.warn(&format!(
                "Failed to create thread pool ({e}), using global pool"
            ));
            f()
        }
    }
}

/// Create `path` if missing. Returns true if it was created.
fn ensure_dir(path: &Path, with_parents: bool) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(false),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "a non-directory is in the way",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if with_parents {
                fs::create_dir_all(path)?;
            } else {
                fs::create_dir(path)?;
            }
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Sorted contents of one source directory.
#[derive(Default)]
struct Listing {
    files: Vec<Entry>,
    dirs: Vec<(PathBuf, PathBuf)>,
}

struct Walk<'a> {
    options: &'a SyncOptions,
    exclude: Option<PathBuf>,
    /// Set when cancellation left a file or directory unvisited
    cut_short: AtomicBool,
}

impl Walk<'_> {
    /// Sync the contents of `src` into the existing directory `dst`.
    fn dir(&self, src: &Path, dst: &Path, depth: usize) -> SyncStats {
        let mut stats = SyncStats::default();

        let listing = match self.list(src, dst) {
            Ok(listing) => listing,
            Err(e) => {
                self.skip_dir(&mut stats, src, &Error::Io(e));
                return stats;
            }
        };

        let outcomes: Vec<Option<CopyOutcome>> = listing
            .files
            .par_iter()
            .map(|entry| {
                if self.options.is_cancelled() {
                    self.cut_short.store(true, Ordering::Relaxed);
                    None
                } else {
                    Some(self.file(entry))
                }
            })
            .collect();

        for (entry, outcome) in listing.files.iter().zip(outcomes) {
            if let Some(outcome) = outcome {
                stats.record(entry, outcome);
            }
        }

        let children: Vec<SyncStats> = listing
            .dirs
            .par_iter()
            .map(|(child_src, child_dst)| self.subdir(child_src, child_dst, depth + 1))
            .collect();

        children.into_iter().fold(stats, SyncStats::merge)
    }

    fn subdir(&self, src: &Path, dst: &Path, depth: usize) -> SyncStats {
        let mut stats = SyncStats::default();
        if self.options.is_cancelled() {
            self.cut_short.store(true, Ordering::Relaxed);
            return stats;
        }

        if let Some(max_depth) = self.options.max_depth {
            if depth > max_depth {
                let error = Error::MaxDepthExceeded {
                    path: src.to_path_buf(),
                    max_depth,
                };
                self.skip_dir(&mut stats, src, &error);
                return stats;
            }
        }

        match ensure_dir(dst, false) {
            Ok(created) => {
                if created {
                    stats.dirs_created += 1;
                    self.options
                        .verbose(&format!("created directory {}", dst.display()));
                }
            }
            Err(source) => {
                let error = Error::CreateDir {
                    path: dst.to_path_buf(),
                    source,
                };
                self.skip_dir(&mut stats, src, &error);
                return stats;
            }
        }

        stats.merge(self.dir(src, dst, depth))
    }

    /// Decide, copy if needed, and log one file.
    fn file(&self, entry: &Entry) -> CopyOutcome {
        let decision = decide(&entry.source, &entry.destination, entry.marker_exists());

        let outcome = if decision.should_copy {
            copy_guarded(entry, decision.is_resume(), self.options)
        } else if decision.reason == Reason::TimestampIndeterminate {
            CopyOutcome::SkippedTimestampIssue {
                detail: decision.detail.unwrap_or_default(),
            }
        } else {
            CopyOutcome::Skipped
        };

        match &outcome {
            CopyOutcome::Failed(e) => {
                self.options.warn(&format!(
                    "Failed to copy {}: {}",
                    entry.source.display(),
                    e
                ));
            }
            CopyOutcome::SkippedTimestampIssue { detail } => {
                self.options.warn(&format!(
                    "Skipping {} for review: {}",
                    entry.source.display(),
                    detail
                ));
            }
            CopyOutcome::Copied { bytes } | CopyOutcome::Resumed { bytes } => {
                self.options.verbose(&format!(
                    "copied {} -> {} ({} bytes, {})",
                    entry.source.display(),
                    entry.destination.display(),
                    bytes,
                    decision.reason
                ));
            }
            CopyOutcome::Skipped => {
                self.options.verbose(&format!(
                    "skipped {} (up to date)",
                    entry.source.display()
                ));
            }
        }

        outcome
    }

    fn list(&self, src: &Path, dst: &Path) -> io::Result<Listing> {
        let mut items = Vec::new();
        for entry in fs::read_dir(src)? {
            match entry.and_then(|e| e.file_type().map(|ft| (e.file_name(), ft))) {
                Ok(item) => items.push(item),
                Err(e) => self.options.warn(&format!(
                    "Skipping unreadable entry in {}: {}",
                    src.display(),
                    e
                )),
            }
        }
        items.sort_by(|a, b| a.0.cmp(&b.0));

        let mut listing = Listing::default();
        for (name, file_type) in items {
            let src_path = src.join(&name);
            let dst_path = dst.join(&name);

            if is_marker_name(&name) {
                self.options.warn(&format!(
                    "Skipping {}: name collides with transfer markers",
                    src_path.display()
                ));
            } else if file_type.is_dir() {
                if self.exclude.as_deref() == Some(src_path.as_path()) {
                    self.options.verbose(&format!(
                        "skipping destination nested in source: {}",
                        src_path.display()
                    ));
                } else {
                    listing.dirs.push((src_path, dst_path));
                }
            } else if file_type.is_file() {
                listing.files.push(Entry::new(src_path, dst_path));
            } else if file_type.is_symlink() {
                // Links to files are mirrored as files; directory links are
                // not followed.
                match fs::metadata(&src_path) {
                    Ok(meta) if meta.is_file() => {
                        listing.files.push(Entry::new(src_path, dst_path));
                    }
                    Ok(_) => self.options.warn(&format!(
                        "Skipping symlink to non-file: {}",
                        src_path.display()
                    )),
                    Err(e) => self.options.warn(&format!(
                        "Skipping broken symlink {}: {}",
                        src_path.display(),
                        e
                    )),
                }
            } else {
                self.options
                    .warn(&format!("Skipping special file: {}", src_path.display()));
            }
        }

        Ok(listing)
    }

    fn skip_dir(&self, stats: &mut SyncStats, path: &Path, error: &Error) {
        self.options.warn(&format!(
            "Skipping directory {}: {}",
            path.display(),
            error
        ));
        stats.failures.push(FailedEntry::new(path.to_path_buf(), error));
    }
}
