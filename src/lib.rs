//! # marksync
//!
//! One-way directory sync that survives crashes, power loss and unplugged
//! drives without leaving silently truncated files behind.
//!
//! ## Core Features
//!
//! - **Transfer markers**: Every copy is bracketed by a `<file>.transferring`
//!   marker that is durable before the first byte is written and removed only
//!   after the file is complete
//! - **Resumable**: A leftover marker forces the file to be redone on the next
//!   run, whatever its timestamp says
//! - **Incremental**: Existing files are replaced only when the source is
//!   strictly newer
//! - **Timestamp sanity checks**: Modification times before 1980 or more than
//!   a day in the future are never trusted; such files are listed for review
//!   instead of being copied
//! - **Failure isolation**: A failed file or directory is recorded and the
//!   walk carries on
//! - **Parallel**: Optional rayon worker pool with results identical to the
//!   sequential walk
//!
//! ## Quick Start
//!
//! ```no_run
//! let stats = marksync::sync("photos", "/mnt/backup/photos")?;
//! println!(
//!     "Copied {} files ({} resumed), {} up to date",
//!     stats.files_copied, stats.transfers_resumed, stats.files_skipped
//! );
//! for entry in &stats.files_with_timestamp_issues {
//!     println!("review: {}", entry.source.display());
//! }
//! # Ok::<(), marksync::Error>(())
//! ```
//!
//! ## Builder API
//!
//! ```no_run
//! use marksync::SyncBuilder;
//!
//! let stats = SyncBuilder::new("data", "/mnt/backup/data")
//!     .parallel(8)
//!     .remove_marker_on_failure()
//!     .run()?;
//! # Ok::<(), marksync::Error>(())
//! ```
//!
//! ## Function API
//!
//! ```no_run
//! use marksync::{sync_dir, FailurePolicy, SyncOptions};
//! use std::path::Path;
//!
//! let options = SyncOptions::default()
//!     .with_parallel(4)
//!     .with_on_failure(FailurePolicy::KeepMarker)
//!     .with_max_depth(16);
//!
//! let stats = sync_dir(Path::new("src"), Path::new("dst"), &options)?;
//! # Ok::<(), marksync::Error>(())
//! ```
//!
//! ## The Marker Protocol
//!
//! For each file that needs copying:
//!
//! 1. `<dest>.transferring` is created, then it and its directory are fsynced
//! 2. The content is copied over `<dest>` and fsynced
//! 3. Permissions and timestamps are applied
//! 4. The marker is deleted
//!
//! An interruption anywhere between 1 and 4 leaves the marker in place. Use
//! [`scan_orphans`] to count them before a run.
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tracing` | Structured logging with tracing crate |
//! | `serde` | Serialize/Deserialize for [`SyncOptions`], Serialize for [`SyncStats`] |
//! | `full` | Enable all optional features |

#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod error;
mod options;
mod sync;

pub use builder::SyncBuilder;
pub use error::{Error, Result, TimestampError, is_no_space_error};
pub use options::{FailurePolicy, SyncOptions};
pub use sync::{
    CopyOutcome, Decision, Entry, FailedEntry, MARKER_SUFFIX, MAX_FUTURE_SKEW, OrphanScan,
    Reason, ReviewEntry, SyncStats, TIMESTAMP_FLOOR, check_timestamp, copy_guarded, decide,
    decide_at, is_marker_name, marker_path, scan_orphans, sync, sync_dir,
};
