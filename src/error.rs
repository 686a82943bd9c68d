//! Error types for marksync.
//!
//! This module provides the [`Error`] enum for everything that can go wrong
//! while syncing, [`TimestampError`] for modification times that cannot be
//! trusted, and the [`Result`] type alias.
//!
//! # Error Categories
//!
//! | Category | Errors | Handling |
//! |----------|--------|----------|
//! | Configuration | [`Error::SourceNotFound`], [`Error::NotADirectory`], [`Error::CreateDir`] | Fatal, returned from [`sync_dir`](crate::sync_dir) |
//! | Per-file | [`Error::MarkerWrite`], [`Error::Copy`], [`Error::MarkerRemove`], [`Error::DestinationIsDirectory`] | Folded into [`CopyOutcome::Failed`](crate::CopyOutcome::Failed) |
//! | Per-directory | [`Error::Io`], [`Error::CreateDir`], [`Error::MaxDepthExceeded`] | Warned, subtree skipped |
//! | Timestamp | [`TimestampError`] | File skipped and queued for review |
//! | Control | [`Error::Cancelled`] | Fatal, carries partial stats |

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncStats;

/// Result type for marksync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Check if an IO error indicates "no space left on device".
///
/// | Platform | Error Detection |
/// |----------|-----------------|
/// | Unix | `ENOSPC` (errno 28) |
/// | Windows | `ERROR_DISK_FULL` (0x70) |
///
/// # Example
///
/// ```
/// use std::io;
/// use marksync::is_no_space_error;
///
/// let error = io::Error::new(io::ErrorKind::StorageFull, "disk full");
/// assert!(is_no_space_error(&error));
/// ```
pub fn is_no_space_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::StorageFull {
        return true;
    }

    #[cfg(unix)]
    {
        if let Some(raw_error) = error.raw_os_error() {
            const ENOSPC: i32 = 28;
            return raw_error == ENOSPC;
        }
    }

    #[cfg(windows)]
    {
        if let Some(raw_error) = error.raw_os_error() {
            const ERROR_DISK_FULL: i32 = 112;
            return raw_error == ERROR_DISK_FULL;
        }
    }

    false
}

/// Errors that can occur during a sync.
///
/// All variants carry the path involved so warnings and review output can
/// name the file.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO error not attributable to a more specific step
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Source path does not exist
    #[error("Source path does not exist: {0}")]
    SourceNotFound(PathBuf),

    /// Source is not a directory
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Failed to create a destination directory
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Failed to write the transfer marker before copying
    #[error("Failed to write transfer marker {path}: {source}")]
    MarkerWrite {
        /// Marker path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Failed to remove the transfer marker after a completed copy
    ///
    /// The destination content is complete, but the leftover marker will
    /// force a re-copy on the next run.
    #[error("Copied, but failed to remove transfer marker {path}: {source}")]
    MarkerRemove {
        /// Marker path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Failed to copy file content or metadata
    #[error("Failed to copy {path}: {source}")]
    Copy {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// A directory occupies the destination path of a source file
    #[error("Destination is a directory: {0}")]
    DestinationIsDirectory(PathBuf),

    /// Directory lies below the configured maximum depth
    #[error("Maximum depth {max_depth} exceeded at: {path}")]
    MaxDepthExceeded {
        /// The directory that was skipped
        path: PathBuf,
        /// The configured maximum depth
        max_depth: usize,
    },

    /// Sync was cancelled via cancellation token
    ///
    /// Files finished before cancellation stay in place. Re-running the
    /// same sync picks up where this one stopped.
    #[error(
        "Sync cancelled ({} files copied, {} skipped)",
        .stats.files_copied,
        .stats.files_skipped
    )]
    Cancelled {
        /// Work completed before cancellation
        stats: Box<SyncStats>,
    },
}

impl Error {
    /// Returns true if this error was caused by a full destination.
    pub fn is_no_space(&self) -> bool {
        match self {
            Self::Io(source)
            | Self::CreateDir { source, .. }
            | Self::MarkerWrite { source, .. }
            | Self::MarkerRemove { source, .. }
            | Self::Copy { source, .. } => is_no_space_error(source),
            _ => false,
        }
    }
}

/// A modification time that cannot be trusted for comparison.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TimestampError {
    /// Metadata or modification time could not be read
    #[error("cannot read modification time of {path}: {source}")]
    Unreadable {
        /// File whose timestamp was requested
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Modification time is earlier than the plausibility floor
    #[error("modification time of {path} predates 1980-01-01 ({secs_before_floor}s before floor)")]
    BeforeFloor {
        /// Offending file
        path: PathBuf,
        /// Distance below the floor, in seconds
        secs_before_floor: u64,
    },

    /// Modification time is too far in the future
    #[error("modification time of {path} is {secs_ahead}s in the future")]
    InFuture {
        /// Offending file
        path: PathBuf,
        /// Distance ahead of the current time, in seconds
        secs_ahead: u64,
    },
}
