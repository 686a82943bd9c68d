//! Copy decisions for a single source/destination pair.
//!
//! Rules are evaluated in order, first match wins:
//!
//! 1. A leftover marker forces a copy ([`Reason::Resumed`]). The bytes at the
//!    destination cannot be trusted, whatever their timestamp says.
//! 2. A missing destination is copied ([`Reason::New`]).
//! 3. Both modification times are read and checked for plausibility. If
//!    either is unreadable, earlier than 1980-01-01, or more than a day in
//!    the future, the file is not copied and is flagged for review
//!    ([`Reason::TimestampIndeterminate`]). Otherwise the file is copied
//!    only if the source is strictly newer ([`Reason::Stale`] vs
//!    [`Reason::UpToDate`]).

use crate::error::TimestampError;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Earliest plausible modification time: 1980-01-01T00:00:00Z.
pub const TIMESTAMP_FLOOR: Duration = Duration::from_secs(315_532_800);

/// How far ahead of the current time a modification time may be.
pub const MAX_FUTURE_SKEW: Duration = Duration::from_secs(24 * 60 * 60);

/// Why a file is (or is not) copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Reason {
    /// A marker from an interrupted transfer was found
    Resumed,
    /// Destination does not exist
    New,
    /// Source is newer than destination
    Stale,
    /// Destination is at least as new as source
    UpToDate,
    /// A modification time could not be trusted
    TimestampIndeterminate,
}

impl Reason {
    /// Short machine-friendly name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resumed => "resumed",
            Self::New => "new",
            Self::Stale => "stale",
            Self::UpToDate => "up_to_date",
            Self::TimestampIndeterminate => "timestamp_indeterminate",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the guarded copy must run
    pub should_copy: bool,
    /// Classification of the decision
    pub reason: Reason,
    /// Diagnostic for [`Reason::TimestampIndeterminate`]
    pub detail: Option<String>,
}

impl Decision {
    fn copy(reason: Reason) -> Self {
        Self {
            should_copy: true,
            reason,
            detail: None,
        }
    }

    fn up_to_date() -> Self {
        Self {
            should_copy: false,
            reason: Reason::UpToDate,
            detail: None,
        }
    }

    fn indeterminate(error: &TimestampError) -> Self {
        Self {
            should_copy: false,
            reason: Reason::TimestampIndeterminate,
            detail: Some(error.to_string()),
        }
    }

    /// Returns true if the copy is redoing an interrupted transfer.
    pub fn is_resume(&self) -> bool {
        self.reason == Reason::Resumed
    }
}

/// Decide whether `source` must be copied over `destination`.
///
/// `marker_exists` reports whether a transfer marker for `destination` was
/// present when the file was reached.
///
/// # Example
///
/// ```no_run
/// use marksync::{decide, Reason};
/// use std::path::Path;
///
/// let decision = decide(Path::new("src/a.txt"), Path::new("dst/a.txt"), false);
/// if decision.reason == Reason::TimestampIndeterminate {
///     eprintln!("review: {}", decision.detail.unwrap_or_default());
/// }
/// ```
pub fn decide(source: &Path, destination: &Path, marker_exists: bool) -> Decision {
    decide_at(source, destination, marker_exists, SystemTime::now())
}

/// [`decide`] against an explicit current time.
pub fn decide_at(
    source: &Path,
    destination: &Path,
    marker_exists: bool,
    now: SystemTime,
) -> Decision {
    if marker_exists {
        return Decision::copy(Reason::Resumed);
    }

    // Follows links: a dangling destination symlink is replaced like a
    // missing file.
    if let Err(e) = fs::metadata(destination) {
        if e.kind() == io::ErrorKind::NotFound {
            return Decision::copy(Reason::New);
        }
    }

    let times = read_checked_mtime(source, now)
        .and_then(|src| read_checked_mtime(destination, now).map(|dst| (src, dst)));

    match times {
        Ok((src_mtime, dst_mtime)) if src_mtime > dst_mtime => Decision::copy(Reason::Stale),
        Ok(_) => Decision::up_to_date(),
        Err(e) => Decision::indeterminate(&e),
    }
}

/// Check that `time` is plausible relative to `now`.
///
/// Rejects times earlier than [`TIMESTAMP_FLOOR`] and times more than
/// [`MAX_FUTURE_SKEW`] ahead of `now`. Both bounds are inclusive.
pub fn check_timestamp(
    path: &Path,
    time: SystemTime,
    now: SystemTime,
) -> Result<SystemTime, TimestampError> {
    let floor = UNIX_EPOCH + TIMESTAMP_FLOOR;
    if let Ok(below) = floor.duration_since(time) {
        if !below.is_zero() {
            return Err(TimestampError::BeforeFloor {
                path: path.to_path_buf(),
                secs_before_floor: below.as_secs().max(1),
            });
        }
    }

    if let Ok(ahead) = time.duration_since(now) {
        if ahead > MAX_FUTURE_SKEW {
            return Err(TimestampError::InFuture {
                path: path.to_path_buf(),
                secs_ahead: ahead.as_secs(),
            });
        }
    }

    Ok(time)
}

fn read_checked_mtime(path: &Path, now: SystemTime) -> Result<SystemTime, TimestampError> {
    let mtime = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| TimestampError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    check_timestamp(path, mtime, now)
}
