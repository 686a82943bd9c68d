//! Marker-guarded directory sync.

mod decide;
mod entry;
mod scan;
mod stats;
mod transfer;
mod walk;

pub use decide::{
    Decision, MAX_FUTURE_SKEW, Reason, TIMESTAMP_FLOOR, check_timestamp, decide, decide_at,
};
pub use entry::{Entry, MARKER_SUFFIX, is_marker_name, marker_path};
pub use scan::{OrphanScan, scan_orphans};
pub use stats::{CopyOutcome, FailedEntry, ReviewEntry, SyncStats};
pub use transfer::copy_guarded;
pub use walk::{sync, sync_dir};
