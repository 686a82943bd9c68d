//! Per-file outcomes and the aggregate statistics of a sync.

use crate::error::Error;
use std::path::PathBuf;

use super::entry::Entry;

/// Result of processing one file.
#[derive(Debug)]
pub enum CopyOutcome {
    /// File was copied
    Copied {
        /// Bytes written to the destination
        bytes: u64,
    },
    /// An interrupted transfer was redone
    Resumed {
        /// Bytes written to the destination
        bytes: u64,
    },
    /// Destination was already up to date
    Skipped,
    /// Timestamps could not be trusted; file left for manual review
    SkippedTimestampIssue {
        /// Why the timestamps were rejected
        detail: String,
    },
    /// Copy failed; the walk continues with the next file
    Failed(Error),
}

/// A file skipped because its timestamps could not be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReviewEntry {
    /// Source file
    pub source: PathBuf,
    /// Destination file
    pub destination: PathBuf,
    /// Diagnostic message
    pub detail: String,
}

/// A file or directory that could not be synced.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FailedEntry {
    /// Path the failure is about
    pub path: PathBuf,
    /// Error message
    pub message: String,
    /// Whether the destination ran out of space
    pub no_space: bool,
}

impl FailedEntry {
    pub(crate) fn new(path: PathBuf, error: &Error) -> Self {
        Self {
            path,
            message: error.to_string(),
            no_space: error.is_no_space(),
        }
    }
}

/// Statistics from a sync operation.
///
/// Every completed copy counts in `files_copied`; `transfers_resumed` is the
/// subset that redid an interrupted transfer.
///
/// Stats from independent subtrees combine with [`SyncStats::merge`], which
/// is associative and, for the counters, commutative. Lists are concatenated
/// in merge order.
///
/// # Example
///
/// ```no_run
/// use marksync::sync;
///
/// let stats = sync("photos", "/mnt/backup/photos")?;
/// println!("{} copied, {} resumed", stats.files_copied, stats.transfers_resumed);
/// for entry in &stats.files_with_timestamp_issues {
///     println!("review: {} ({})", entry.source.display(), entry.detail);
/// }
/// # Ok::<(), marksync::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SyncStats {
    /// Number of files copied (including resumed transfers)
    pub files_copied: u64,
    /// Number of files skipped because the destination was up to date
    pub files_skipped: u64,
    /// Number of files skipped because of untrustworthy timestamps
    pub files_skipped_timestamp: u64,
    /// Number of destination directories created
    pub dirs_created: u64,
    /// Number of interrupted transfers that were redone
    pub transfers_resumed: u64,
    /// Number of files whose copy failed
    pub files_failed: u64,
    /// Total bytes copied
    pub bytes_copied: u64,
    /// Files flagged for manual review
    pub files_with_timestamp_issues: Vec<ReviewEntry>,
    /// Files and directories that failed
    pub failures: Vec<FailedEntry>,
}

impl SyncStats {
    /// Fold another set of stats into this one.
    #[must_use]
    pub fn merge(mut self, other: SyncStats) -> SyncStats {
        self.files_copied += other.files_copied;
        self.files_skipped += other.files_skipped;
        self.files_skipped_timestamp += other.files_skipped_timestamp;
        self.dirs_created += other.dirs_created;
        self.transfers_resumed += other.transfers_resumed;
        self.files_failed += other.files_failed;
        self.bytes_copied += other.bytes_copied;
        self.files_with_timestamp_issues
            .extend(other.files_with_timestamp_issues);
        self.failures.extend(other.failures);
        self
    }

    /// Count one file's outcome.
    pub fn record(&mut self, entry: &Entry, outcome: CopyOutcome) {
        match outcome {
            CopyOutcome::Copied { bytes } => {
                self.files_copied += 1;
                self.bytes_copied += bytes;
            }
            CopyOutcome::Resumed { bytes } => {
                self.files_copied += 1;
                self.transfers_resumed += 1;
                self.bytes_copied += bytes;
            }
            CopyOutcome::Skipped => self.files_skipped += 1,
            CopyOutcome::SkippedTimestampIssue { detail } => {
                self.files_skipped_timestamp += 1;
                self.files_with_timestamp_issues.push(ReviewEntry {
                    source: entry.source.clone(),
                    destination: entry.destination.clone(),
                    detail,
                });
            }
            CopyOutcome::Failed(error) => {
                self.files_failed += 1;
                self.failures
                    .push(FailedEntry::new(entry.source.clone(), &error));
            }
        }
    }

    /// Returns true if any file or directory failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
